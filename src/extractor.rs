use crate::dialog_template::decode_dialog;
use crate::err::{DecodeResult, Error, Result};
use crate::menu_template::decode_menu;
use crate::message_table::decode_message_table;
use crate::pe_resources::{
    RT_DIALOG, RT_MENU, RT_MESSAGETABLE, RT_STRING, Resource, resources_of_type, select_language,
};
use crate::string_table::decode_string_table;
use crate::text_record::{RecordSink, TextRecord};

use encoding::EncodingRef;
use log::{debug, info, warn};
use std::fmt;
use std::fs;
use std::path::Path;

#[cfg(feature = "multithreading")]
use rayon::prelude::*;

/// The kind of resource text to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Strings,
    Dialogs,
    Messages,
    Menus,
}

impl ResourceKind {
    /// The numeric resource type (`RT_*`) holding this kind.
    pub fn resource_type(self) -> u16 {
        match self {
            ResourceKind::Strings => RT_STRING,
            ResourceKind::Dialogs => RT_DIALOG,
            ResourceKind::Messages => RT_MESSAGETABLE,
            ResourceKind::Menus => RT_MENU,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceKind::Strings => "string table",
            ResourceKind::Dialogs => "dialog",
            ResourceKind::Messages => "message table",
            ResourceKind::Menus => "menu",
        })
    }
}

#[derive(Clone)]
pub struct ExtractSettings {
    kind: ResourceKind,
    /// Preferred language id; resources without it fall back to their first language.
    language: Option<u16>,
    /// Used to decode non-unicode (ANSI) message table entries.
    ansi_codec: EncodingRef,
    num_threads: usize,
}

impl fmt::Debug for ExtractSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractSettings")
            .field("kind", &self.kind)
            .field("language", &self.language)
            .field("ansi_codec", &self.ansi_codec.name())
            .field("num_threads", &self.num_threads)
            .finish()
    }
}

impl PartialEq for ExtractSettings {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.language == other.language
            && self.ansi_codec.name() == other.ansi_codec.name()
            && self.num_threads == other.num_threads
    }
}

impl Default for ExtractSettings {
    fn default() -> Self {
        ExtractSettings {
            kind: ResourceKind::Strings,
            language: None,
            ansi_codec: encoding::all::WINDOWS_1252,
            num_threads: 0,
        }
    }
}

impl ExtractSettings {
    pub fn new() -> Self {
        ExtractSettings::default()
    }

    pub fn kind(mut self, kind: ResourceKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn language(mut self, language: Option<u16>) -> Self {
        self.language = language;
        self
    }

    pub fn ansi_codec(mut self, ansi_codec: EncodingRef) -> Self {
        self.ansi_codec = ansi_codec;
        self
    }

    /// Sets the number of worker threads.
    /// `0` will let rayon decide.
    pub fn num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = if num_threads == 0 {
            #[cfg(feature = "multithreading")]
            {
                rayon::current_num_threads()
            }
            #[cfg(not(feature = "multithreading"))]
            {
                1
            }
        } else {
            num_threads
        };
        self
    }

    pub fn get_kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn get_language(&self) -> Option<u16> {
        self.language
    }

    pub fn get_ansi_codec(&self) -> EncodingRef {
        self.ansi_codec
    }

    pub fn get_num_threads(&self) -> usize {
        self.num_threads
    }
}

/// The outcome of extracting one resource kind from one module.
#[derive(Debug, Default)]
pub struct Extraction {
    /// Records of every resource, in resource-directory order.
    pub records: Vec<TextRecord>,
    /// Resources that failed to decode. Records they emitted before failing are kept.
    pub failures: Vec<Error>,
}

pub struct Extractor {
    settings: ExtractSettings,
}

impl Extractor {
    pub fn new(settings: ExtractSettings) -> Self {
        Extractor { settings }
    }

    pub fn settings(&self) -> &ExtractSettings {
        &self.settings
    }

    pub fn extract_from_path(&self, path: impl AsRef<Path>) -> Result<Extraction> {
        let path = path.as_ref();
        let pe_bytes = fs::read(path).map_err(|source| Error::FailedToRead {
            path: path.display().to_string(),
            source,
        })?;
        self.extract(&pe_bytes)
    }

    /// Extract the configured resource kind from an in-memory PE image.
    ///
    /// Only failures to walk the resource directory itself are errors; a resource that fails to
    /// decode is logged, recorded in [`Extraction::failures`], and extraction moves on.
    pub fn extract(&self, pe_bytes: &[u8]) -> Result<Extraction> {
        let kind = self.settings.kind;
        let resources = select_language(
            resources_of_type(pe_bytes, kind.resource_type())?,
            self.settings.language,
        );
        info!("Found {} {} resources", resources.len(), kind);

        Ok(self.decode_resources(&resources))
    }

    pub fn decode_resources(&self, resources: &[Resource]) -> Extraction {
        let decoded = self.decode_all(resources);

        let mut extraction = Extraction::default();
        for (resource, (records, result)) in resources.iter().zip(decoded) {
            extraction.records.extend(records);
            if let Err(source) = result {
                warn!(
                    "Failed to decode {} {} (lang 0x{:04x}): {}",
                    self.settings.kind, resource.id, resource.lang_id, source
                );
                extraction.failures.push(Error::FailedToDecodeResource {
                    resource: resource.id.to_string(),
                    source,
                });
            }
        }
        extraction
    }

    #[cfg(feature = "multithreading")]
    fn decode_all(&self, resources: &[Resource]) -> Vec<(Vec<TextRecord>, DecodeResult<usize>)> {
        if self.settings.num_threads == 1 || resources.len() <= 1 {
            return resources.iter().map(|r| self.decode_collect(r)).collect();
        }
        // `collect` on an indexed parallel iterator keeps the input order.
        if self.settings.num_threads == 0 {
            return resources
                .par_iter()
                .map(|r| self.decode_collect(r))
                .collect();
        }

        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.num_threads)
            .build()
        {
            Ok(pool) => pool.install(|| {
                resources
                    .par_iter()
                    .map(|r| self.decode_collect(r))
                    .collect()
            }),
            Err(e) => {
                warn!("Failed to build thread pool ({}), decoding sequentially", e);
                resources.iter().map(|r| self.decode_collect(r)).collect()
            }
        }
    }

    #[cfg(not(feature = "multithreading"))]
    fn decode_all(&self, resources: &[Resource]) -> Vec<(Vec<TextRecord>, DecodeResult<usize>)> {
        resources.iter().map(|r| self.decode_collect(r)).collect()
    }

    fn decode_collect(&self, resource: &Resource) -> (Vec<TextRecord>, DecodeResult<usize>) {
        let mut records: Vec<TextRecord> = Vec::new();
        let result = self.decode_resource(resource, &mut records);
        (records, result)
    }

    /// Decode a single resource of the configured kind into `sink`, returning the number of
    /// records emitted.
    pub fn decode_resource(
        &self,
        resource: &Resource,
        sink: &mut impl RecordSink,
    ) -> DecodeResult<usize> {
        let mut counter = CountingSink { inner: sink, count: 0 };
        let id = &resource.id;
        let data = resource.data.as_slice();

        match self.settings.kind {
            ResourceKind::Dialogs => decode_dialog(id, data, &mut counter).map(|_| ())?,
            ResourceKind::Menus => decode_menu(id, data, &mut counter).map(|_| ())?,
            ResourceKind::Messages => {
                decode_message_table(id, data, self.settings.ansi_codec, &mut counter)
                    .map(|_| ())?
            }
            ResourceKind::Strings => decode_string_table(id, data, &mut counter).map(|_| ())?,
        }

        debug!(
            "{} {}: {} records",
            self.settings.kind, resource.id, counter.count
        );
        Ok(counter.count)
    }
}

struct CountingSink<'s, S> {
    inner: &'s mut S,
    count: usize,
}

impl<S: RecordSink> RecordSink for CountingSink<'_, S> {
    fn emit(&mut self, record: TextRecord) {
        self.count += 1;
        self.inner.emit(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource_id::ResourceId;
    use crate::text_record::ItemId;
    use pretty_assertions::assert_eq;

    fn string_block(first: &str) -> Vec<u8> {
        let units: Vec<u16> = first.encode_utf16().collect();
        let mut out = Vec::new();
        out.extend_from_slice(&(units.len() as u16).to_le_bytes());
        for u in units {
            out.extend_from_slice(&u.to_le_bytes());
        }
        out.extend_from_slice(&[0u8; 30]);
        out
    }

    #[test]
    fn test_settings_builder() {
        let settings = ExtractSettings::new()
            .kind(ResourceKind::Menus)
            .language(Some(0x0409))
            .num_threads(3);

        assert_eq!(settings.get_kind(), ResourceKind::Menus);
        assert_eq!(settings.get_language(), Some(0x0409));
        assert_eq!(settings.get_num_threads(), 3);
        assert_eq!(settings.get_ansi_codec().name(), "windows-1252");
        assert!(settings.num_threads(0).get_num_threads() >= 1);
    }

    #[test]
    fn test_failures_do_not_stop_other_resources() {
        crate::ensure_env_logger_initialized();
        let resources = vec![
            Resource {
                id: ResourceId::Id(1),
                lang_id: 0x0409,
                data: string_block("first"),
            },
            Resource {
                id: ResourceId::Id(2),
                lang_id: 0x0409,
                data: vec![5, 0, b'x', 0],
            },
            Resource {
                id: ResourceId::Id(3),
                lang_id: 0x0409,
                data: string_block("third"),
            },
        ];

        for threads in [1, 4] {
            let extractor = Extractor::new(
                ExtractSettings::new()
                    .kind(ResourceKind::Strings)
                    .num_threads(threads),
            );
            let extraction = extractor.decode_resources(&resources);

            let items: Vec<(ItemId, &str)> = extraction
                .records
                .iter()
                .map(|r| (r.item, r.text.as_str()))
                .collect();
            assert_eq!(items, vec![(ItemId::Id(0), "first"), (ItemId::Id(32), "third")]);
            assert_eq!(extraction.failures.len(), 1);
            assert!(matches!(
                &extraction.failures[0],
                Error::FailedToDecodeResource { resource, .. } if resource == "2"
            ));
        }
    }
}
