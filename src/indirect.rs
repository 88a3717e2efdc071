//! Resolution of indirect string references of the form `@<module path>,-<string id>`.
//!
//! An optional `;v<version>` suffix is accepted and ignored. `%NAME%` environment variables in
//! the module path are expanded when resolving. Package references (`@{...}`) and positive
//! resource ids need the platform loader and are reported as unsupported.

use crate::err::{Error, IndirectStringError, Result};
use crate::pe_resources::{RT_STRING, resources_of_type, select_language};
use crate::string_table::{block_of, lookup_string};

use log::debug;
use std::env;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndirectString {
    pub module: PathBuf,
    pub string_id: u32,
}

impl FromStr for IndirectString {
    type Err = IndirectStringError;

    fn from_str(reference: &str) -> std::result::Result<Self, Self::Err> {
        let malformed = || IndirectStringError::Malformed {
            reference: reference.to_string(),
        };

        let body = reference.trim().strip_prefix('@').ok_or_else(malformed)?;
        if body.starts_with('{') {
            return Err(IndirectStringError::Unsupported {
                reference: reference.to_string(),
            });
        }

        let (module, id) = body.rsplit_once(',').ok_or_else(malformed)?;
        if module.is_empty() {
            return Err(malformed());
        }

        let id = match id.split_once(';') {
            Some((id, _version)) => id.trim(),
            None => id.trim(),
        };
        let Some(id) = id.strip_prefix('-') else {
            return Err(IndirectStringError::Unsupported {
                reference: reference.to_string(),
            });
        };
        let string_id = id.parse::<u32>().map_err(|_| malformed())?;

        Ok(IndirectString {
            module: PathBuf::from(module),
            string_id,
        })
    }
}

impl fmt::Display for IndirectString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{},-{}", self.module.display(), self.string_id)
    }
}

/// Replace every `%NAME%` in `path` by `lookup(NAME)`.
///
/// Unknown variables, `%%` and an unpaired `%` are kept as written.
fn expand_env_vars_with(path: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(path.len());
    let mut rest = path;

    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('%') {
            Some(end) if end > 0 => {
                let name = &after[..end];
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push('%');
                        out.push_str(name);
                        out.push('%');
                    }
                }
                rest = &after[end + 1..];
            }
            Some(_) => {
                out.push_str("%%");
                rest = &after[1..];
            }
            None => {
                out.push('%');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

impl IndirectString {
    /// The module path with `%NAME%` environment variables expanded.
    pub fn module_path(&self) -> PathBuf {
        let module = self.module.to_string_lossy();
        if !module.contains('%') {
            return self.module.clone();
        }
        PathBuf::from(expand_env_vars_with(&module, |name| env::var(name).ok()))
    }

    /// Load the referenced module and return the (unescaped) string.
    pub fn resolve(&self, lang_id: Option<u16>) -> Result<String> {
        let module = self.module_path();
        debug!("Loading {} for {}", module.display(), self);
        let pe_bytes = fs::read(&module).map_err(|source| Error::FailedToRead {
            path: module.display().to_string(),
            source,
        })?;

        let blocks = select_language(resources_of_type(&pe_bytes, RT_STRING)?, lang_id);
        debug!(
            "Resolving {} from {} string blocks (block {})",
            self,
            blocks.len(),
            block_of(self.string_id)
        );

        let text = lookup_string(&blocks, self.string_id).map_err(|source| {
            Error::FailedToDecodeResource {
                resource: block_of(self.string_id).to_string(),
                source,
            }
        })?;

        text.ok_or_else(|| {
            IndirectStringError::NotFound {
                module: module.display().to_string(),
                id: self.string_id,
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(s: &str) -> std::result::Result<IndirectString, IndirectStringError> {
        s.parse()
    }

    #[test]
    fn test_parses_module_and_id() {
        assert_eq!(
            parse("@%SystemRoot%\\system32\\shell32.dll,-21787").unwrap(),
            IndirectString {
                module: PathBuf::from("%SystemRoot%\\system32\\shell32.dll"),
                string_id: 21787,
            }
        );
        assert_eq!(parse("@a,b.dll,-5;v2").unwrap().module, PathBuf::from("a,b.dll"));
    }

    #[test]
    fn test_expands_environment_variables() {
        let lookup = |name: &str| match name {
            "SystemRoot" => Some("C:\\Windows".to_string()),
            "ProgramFiles" => Some("C:\\Program Files".to_string()),
            _ => None,
        };

        assert_eq!(
            expand_env_vars_with("%SystemRoot%\\system32\\shell32.dll", lookup),
            "C:\\Windows\\system32\\shell32.dll"
        );
        assert_eq!(
            expand_env_vars_with("%ProgramFiles%\\%Unset%\\app.exe", lookup),
            "C:\\Program Files\\%Unset%\\app.exe"
        );
        assert_eq!(expand_env_vars_with("100%%\\50%", lookup), "100%%\\50%");
        assert_eq!(expand_env_vars_with("plain.dll", lookup), "plain.dll");
    }

    #[test]
    fn test_module_path_without_variables_is_unchanged() {
        let reference = parse("@res\\strings.dll,-7").unwrap();
        assert_eq!(reference.module_path(), PathBuf::from("res\\strings.dll"));
    }

    #[test]
    fn test_rejects_other_forms() {
        assert!(matches!(
            parse("shell32.dll,-1"),
            Err(IndirectStringError::Malformed { .. })
        ));
        assert!(matches!(
            parse("@shell32.dll,-x"),
            Err(IndirectStringError::Malformed { .. })
        ));
        assert!(matches!(
            parse("@shell32.dll,12"),
            Err(IndirectStringError::Unsupported { .. })
        ));
        assert!(matches!(
            parse("@{Microsoft.Windows.Photos?ms-resource://x}"),
            Err(IndirectStringError::Unsupported { .. })
        ));
    }
}
