//! Offline enumeration of PE resources (via `goblin`).
//!
//! The resource section is a three level tree: type -> name/id -> language -> data entry.
//! Only the header and the section table are parsed by `goblin`; the tree itself is walked here so
//! that every offset can be checked against the `.rsrc` bounds.
//!
//! References:
//! - Microsoft PE/COFF specification, "The .rsrc Section"

use crate::err::ExtractError;
use crate::resource_id::ResourceId;
use crate::utils::bytes;

use goblin::pe::header;
use goblin::pe::options::ParseOptions;
use goblin::pe::resource::{ImageResourceDirectory, ResourceDataEntry, ResourceEntry};
use goblin::pe::section_table::SectionTable;
use log::{debug, trace};

pub const RT_MENU: u16 = 4;
pub const RT_DIALOG: u16 = 5;
pub const RT_STRING: u16 = 6;
pub const RT_MESSAGETABLE: u16 = 11;

const IMAGE_RESOURCE_DIRECTORY_HEADER_SIZE: usize = 16;
const RESOURCE_DATA_ENTRY_SIZE: usize = 16;

/// A single leaf of the resource tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// The second-level entry under the resource type.
    pub id: ResourceId,
    /// Language ID of the third-level entry.
    pub lang_id: u16,
    /// Raw resource bytes, exactly `size` bytes as declared by the data entry.
    pub data: Vec<u8>,
}

/// The located `.rsrc` directory of a PE image.
struct ResourceSection<'a> {
    pe_bytes: &'a [u8],
    rsrc: &'a [u8],
    sections: Vec<SectionTable>,
    file_alignment: u32,
    opts: ParseOptions,
}

fn malformed(message: &'static str) -> ExtractError {
    ExtractError::MalformedResource { message }
}

impl<'a> ResourceSection<'a> {
    /// Returns `None` when the image has no resource directory at all.
    fn locate(pe_bytes: &'a [u8]) -> Result<Option<Self>, ExtractError> {
        // `PE::parse` eagerly parses every data directory and rejects images that are fine for
        // our purposes (e.g. `FileAlignment == 0`); the header and section table are enough.
        let header = header::Header::parse(pe_bytes).map_err(|_| ExtractError::InvalidPe {
            message: "failed to parse PE via goblin",
        })?;

        let Some(optional_header) = header.optional_header else {
            return Err(ExtractError::InvalidPe {
                message: "missing optional header",
            });
        };

        let Some(resource_table) = optional_header.data_directories.get_resource_table() else {
            return Ok(None);
        };
        if resource_table.virtual_address == 0 || resource_table.size == 0 {
            return Ok(None);
        }

        let optional_header_offset = header.dos_header.pe_pointer as usize
            + header::SIZEOF_PE_MAGIC
            + header::SIZEOF_COFF_HEADER;
        let mut sections_offset =
            optional_header_offset + header.coff_header.size_of_optional_header as usize;
        let sections = header
            .coff_header
            .sections(pe_bytes, &mut sections_offset)
            .map_err(|_| ExtractError::MalformedPe {
                message: "failed to parse section headers",
            })?;

        let mut section = ResourceSection {
            pe_bytes,
            rsrc: &[],
            sections,
            file_alignment: optional_header.windows_fields.file_alignment,
            opts: ParseOptions::default(),
        };
        section.rsrc = section.map_rva(resource_table.virtual_address, resource_table.size)?;
        debug!(
            "Resource directory at RVA 0x{:08x}, {} bytes",
            resource_table.virtual_address, resource_table.size
        );

        Ok(Some(section))
    }

    /// Map `size` bytes at `rva` to a slice of the file.
    fn map_rva(&self, rva: u32, size: u32) -> Result<&'a [u8], ExtractError> {
        let offset = goblin::pe::utils::find_offset(
            rva as usize,
            &self.sections,
            self.file_alignment,
            &self.opts,
        )
        .ok_or(ExtractError::UnmappedRva { rva })?;

        let end = offset
            .checked_add(size as usize)
            .ok_or(ExtractError::MalformedPe {
                message: "resource data overflow",
            })?;

        self.pe_bytes
            .get(offset..end)
            .ok_or(ExtractError::MalformedPe {
                message: "resource data out of bounds",
            })
    }

    fn u16_at(&self, offset: usize, message: &'static str) -> Result<u16, ExtractError> {
        bytes::read_u16_le(self.rsrc, offset).ok_or_else(|| malformed(message))
    }

    fn u32_at(&self, offset: usize, message: &'static str) -> Result<u32, ExtractError> {
        bytes::read_u32_le(self.rsrc, offset).ok_or_else(|| malformed(message))
    }

    fn entries(&self, dir_offset: usize) -> Result<Vec<ResourceEntry>, ExtractError> {
        let header_end = dir_offset
            .checked_add(IMAGE_RESOURCE_DIRECTORY_HEADER_SIZE)
            .ok_or_else(|| malformed("resource directory entries offset overflow"))?;
        if header_end > self.rsrc.len() {
            return Err(malformed("resource directory header out of bounds"));
        }

        let dir = ImageResourceDirectory {
            characteristics: self.u32_at(dir_offset, "resource directory characteristics")?,
            time_date_stamp: self.u32_at(dir_offset + 4, "resource directory time_date_stamp")?,
            major_version: self.u16_at(dir_offset + 8, "resource directory major_version")?,
            minor_version: self.u16_at(dir_offset + 10, "resource directory minor_version")?,
            number_of_named_entries: self
                .u16_at(dir_offset + 12, "resource directory number_of_named_entries")?,
            number_of_id_entries: self
                .u16_at(dir_offset + 14, "resource directory number_of_id_entries")?,
        };

        dir.next_iter(header_end, self.rsrc)
            .map_err(|_| malformed("resource directory entries out of bounds"))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| malformed("failed to parse resource directory entries"))
    }

    /// Names are stored as a `u16` character count followed by that many UTF-16 units.
    fn name(&self, offset: usize) -> Result<String, ExtractError> {
        let char_count = self.u16_at(offset, "resource name length out of bounds")? as usize;
        let start = offset
            .checked_add(2)
            .ok_or_else(|| malformed("resource name offset overflow"))?;
        let end = start
            .checked_add(char_count * 2)
            .ok_or_else(|| malformed("resource name end overflow"))?;
        let buf = self
            .rsrc
            .get(start..end)
            .ok_or_else(|| malformed("resource name out of bounds"))?;

        let units: Vec<u16> = buf
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16(&units).map_err(|_| ExtractError::InvalidResourceName)
    }

    fn identifier(&self, entry: ResourceEntry) -> Result<ResourceId, ExtractError> {
        if entry.name_is_string() {
            Ok(ResourceId::Name(self.name(entry.name_offset() as usize)?))
        } else {
            let id = entry.name_offset();
            u16::try_from(id)
                .map(ResourceId::Id)
                .map_err(|_| ExtractError::UnsupportedResourceId { id })
        }
    }

    fn data_entry(&self, offset: usize) -> Result<ResourceDataEntry, ExtractError> {
        if offset.saturating_add(RESOURCE_DATA_ENTRY_SIZE) > self.rsrc.len() {
            return Err(malformed("resource data entry out of bounds"));
        }

        Ok(ResourceDataEntry {
            offset_to_data: self.u32_at(offset, "resource data entry RVA out of bounds")?,
            size: self.u32_at(offset + 4, "resource data entry size out of bounds")?,
            code_page: self.u32_at(offset + 8, "resource data entry code_page out of bounds")?,
            reserved: self.u32_at(offset + 12, "resource data entry reserved out of bounds")?,
        })
    }
}

/// Extract every resource of the numeric type `type_id` from a PE image, in directory order
/// (named entries first, then ids ascending, as the linker stores them).
///
/// Returns an empty vector if the PE has no resources or no resources of that type. Zero-sized
/// data entries are skipped.
pub fn resources_of_type(pe_bytes: &[u8], type_id: u16) -> Result<Vec<Resource>, ExtractError> {
    let Some(section) = ResourceSection::locate(pe_bytes)? else {
        debug!("Image has no resource directory");
        return Ok(Vec::new());
    };

    let type_entry = section
        .entries(0)?
        .into_iter()
        .find(|entry| !entry.name_is_string() && entry.name_offset() == u32::from(type_id));

    let Some(type_entry) = type_entry else {
        debug!("Image has no resources of type {}", type_id);
        return Ok(Vec::new());
    };
    if !type_entry.data_is_directory() {
        return Ok(Vec::new());
    }

    let mut out = Vec::new();
    for resource_entry in section.entries(type_entry.offset_to_directory() as usize)? {
        if !resource_entry.data_is_directory() {
            continue;
        }
        let id = section.identifier(resource_entry)?;

        for lang_entry in section.entries(resource_entry.offset_to_directory() as usize)? {
            if lang_entry.name_is_string() {
                continue;
            }
            let lang_id = u16::try_from(lang_entry.name_offset()).map_err(|_| {
                ExtractError::UnsupportedResourceId {
                    id: lang_entry.name_offset(),
                }
            })?;

            let Some(data_entry_offset) = lang_entry.offset_to_data() else {
                continue;
            };
            let data_entry = section.data_entry(data_entry_offset as usize)?;
            if data_entry.size == 0 {
                continue;
            }

            let data = section.map_rva(data_entry.offset_to_data, data_entry.size)?;
            trace!(
                "Resource type {} id {} lang 0x{:04x}: {} bytes",
                type_id,
                id,
                lang_id,
                data.len()
            );

            out.push(Resource {
                id: id.clone(),
                lang_id,
                data: data.to_vec(),
            });
        }
    }

    Ok(out)
}

/// Keep one language per resource id: `lang_id` when present, otherwise the first one listed.
///
/// With no requested language, every language entry is kept.
pub fn select_language(resources: Vec<Resource>, lang_id: Option<u16>) -> Vec<Resource> {
    let Some(lang_id) = lang_id else {
        return resources;
    };

    let mut out: Vec<Resource> = Vec::with_capacity(resources.len());
    for resource in resources {
        match out.last_mut() {
            Some(last) if last.id == resource.id => {
                if resource.lang_id == lang_id && last.lang_id != lang_id {
                    *last = resource;
                }
            }
            _ => out.push(resource),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(id: u16, lang_id: u16) -> Resource {
        Resource {
            id: ResourceId::Id(id),
            lang_id,
            data: vec![id as u8],
        }
    }

    #[test]
    fn test_select_language_prefers_requested_then_first() {
        let all = vec![
            resource(1, 0x0409),
            resource(1, 0x040c),
            resource(2, 0x0409),
            resource(3, 0x040c),
            resource(3, 0x0407),
        ];

        let picked: Vec<(u16, u16)> = select_language(all.clone(), Some(0x040c))
            .into_iter()
            .map(|r| (r.id.as_id().unwrap(), r.lang_id))
            .collect();
        assert_eq!(picked, vec![(1, 0x040c), (2, 0x0409), (3, 0x040c)]);

        assert_eq!(select_language(all, None).len(), 5);
    }

    #[test]
    fn test_non_pe_is_rejected() {
        assert!(matches!(
            resources_of_type(b"not a PE at all", RT_DIALOG),
            Err(ExtractError::InvalidPe { .. })
        ));
    }
}
