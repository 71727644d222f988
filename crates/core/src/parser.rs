//! Strict decoding of pathway definitions from YAML and JSON.

use crate::constants::{PATHWAY_EXTENSIONS, UNKNOWN_PATHWAY_NAME};
use crate::pathway::Pathway;
use crate::validation::Validator;
use crate::{PathwayError, PathwayResult};
use rand::RngCore;
use serde::de::DeserializeOwned;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// Decodes YAML text, reporting the path of the first field that doesn't match `T`.
///
/// `what` names the document in the error message, e.g. `"Doctors"`.
pub(crate) fn decode_yaml<T: DeserializeOwned>(text: &str, what: &str) -> PathwayResult<T> {
    let deserializer = serde_yaml::Deserializer::from_str(text);
    serde_path_to_error::deserialize(deserializer).map_err(|err| schema_mismatch(what, err))
}

/// Same as [`decode_yaml`] for JSON text.
pub(crate) fn decode_json<T: DeserializeOwned>(text: &str, what: &str) -> PathwayResult<T> {
    let mut deserializer = serde_json::Deserializer::from_str(text);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|err| schema_mismatch(what, err))
}

fn schema_mismatch<E: std::fmt::Display>(what: &str, err: serde_path_to_error::Error<E>) -> PathwayError {
    let path = err.path().to_string();
    let source = err.into_inner();
    let path = if path.is_empty() {
        "<root>"
    } else {
        path.as_str()
    };
    PathwayError::Decode(format!("{what} schema mismatch at {path}: {source}"))
}

fn has_valid_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| PATHWAY_EXTENSIONS.contains(&ext))
}

/// Loads pathway definitions and validates them against the hospital's registries.
pub struct Parser<'a> {
    validator: Validator<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(validator: Validator<'a>) -> Self {
        Self { validator }
    }

    /// Parses every pathway file in `dir`.
    ///
    /// Files are read in name order; files without a `.yml`, `.yaml` or `.json` extension are
    /// skipped. The returned pathways are initialised and valid, but not runnable: they are
    /// resolved each time they are picked.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or a file cannot be read, if a file doesn't decode,
    /// if a file holds any invalid pathway, if a pathway name is declared more than once, or
    /// if no pathway was found.
    pub fn parse_dir(
        &self,
        dir: &Path,
        rng: &mut dyn RngCore,
    ) -> PathwayResult<HashMap<String, Pathway>> {
        tracing::info!(pathway_dir = %dir.display(), "Parsing pathways from directory");
        let files = list_files(dir)?;

        let mut pathways = HashMap::new();
        let mut redeclared = BTreeSet::new();
        for file in files {
            let file_name = file.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            if !has_valid_extension(&file) {
                tracing::warn!(
                    pathway_dir = %dir.display(),
                    "File name has invalid extension {file_name}, expected one of {PATHWAY_EXTENSIONS:?}. Skipping..."
                );
                continue;
            }
            tracing::info!(pathway_file = %file_name, "Parsing pathways from file");
            for (name, pathway) in self.parse_file(&file, rng)? {
                if pathways.contains_key(&name) {
                    tracing::error!(pathway_file = %file_name, pathway_name = %name, "Pathway re-declared");
                    redeclared.insert(name);
                    continue;
                }
                tracing::debug!(pathway_file = %file_name, pathway_name = %name, "Adding pathway");
                pathways.insert(name, pathway);
            }
        }

        if pathways.is_empty() {
            return Err(PathwayError::NoPathways {
                dir: dir.to_path_buf(),
            });
        }
        if !redeclared.is_empty() {
            return Err(PathwayError::RedeclaredPathways {
                dir: dir.to_path_buf(),
                names: redeclared.into_iter().collect(),
            });
        }
        Ok(pathways)
    }

    /// Parses one pathway, either bare or as a single-entry map of name to pathway.
    ///
    /// A bare pathway is named `unknown_pathway`. The result is initialised, valid and runnable.
    pub fn parse_single(&self, bytes: &[u8], rng: &mut dyn RngCore) -> PathwayResult<Pathway> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| PathwayError::Decode(format!("pathway is not valid UTF-8: {e}")))?;

        // YAML is a superset of JSON, so both formats decode here.
        let (name, mut pathway) = match decode_yaml::<Pathway>(text, "Pathway") {
            Ok(pathway) => (UNKNOWN_PATHWAY_NAME.to_owned(), pathway),
            Err(err) if looks_like_bare_pathway(text) => return Err(err),
            Err(_) => {
                let map: HashMap<String, Pathway> = decode_yaml(text, "Pathway map")?;
                if map.len() != 1 {
                    return Err(PathwayError::TooManyPathways(map.len()));
                }
                map.into_iter()
                    .next()
                    .ok_or(PathwayError::TooManyPathways(0))?
            }
        };

        pathway.init(&name);
        self.validator.check(&mut pathway, rng)?;
        pathway.runnable(rng)
    }

    fn parse_file(
        &self,
        file: &Path,
        rng: &mut dyn RngCore,
    ) -> PathwayResult<HashMap<String, Pathway>> {
        let text = fs::read_to_string(file).map_err(|source| PathwayError::FileRead {
            path: file.to_path_buf(),
            source,
        })?;
        let what = format!("Pathway file {}", file.display());
        let is_json = file.extension().is_some_and(|ext| ext == "json");
        let mut pathways: HashMap<String, Pathway> = if is_json {
            decode_json(&text, &what)?
        } else {
            decode_yaml(&text, &what)?
        };

        let mut invalid = Vec::new();
        for (name, pathway) in pathways.iter_mut() {
            pathway.init(name);
            if self.validator.validate(pathway, rng).is_err() {
                tracing::error!(pathway_file = %file.display(), pathway_name = %name, "Invalid pathway");
                invalid.push(name.clone());
            }
        }
        if !invalid.is_empty() {
            invalid.sort();
            return Err(PathwayError::InvalidPathways { names: invalid });
        }
        Ok(pathways)
    }
}

/// Whether the document's top level has the sections of a single pathway rather than names.
fn looks_like_bare_pathway(text: &str) -> bool {
    match serde_yaml::from_str::<serde_yaml::Value>(text) {
        Ok(serde_yaml::Value::Mapping(map)) => BARE_PATHWAY_KEYS
            .iter()
            .any(|key| map.contains_key(*key)),
        _ => false,
    }
}

const BARE_PATHWAY_KEYS: [&str; 2] = ["pathway", "historical_data"];

fn list_files(dir: &Path) -> PathwayResult<Vec<PathBuf>> {
    let dir_err = |source| PathwayError::DirList {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(dir_err)? {
        let path = entry.map_err(dir_err)?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::tests::Fixture;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    const ADMIT_AND_DISCHARGE: &str = "  pathway:\n    - admission:\n        loc: Renal\n    - discharge: {}\n";

    fn write(dir: &TempDir, name: &str, contents: &str) {
        fs::write(dir.path().join(name), contents).expect("write pathway file");
    }

    fn parse_dir(dir: &TempDir) -> PathwayResult<HashMap<String, Pathway>> {
        let fixture = Fixture::new();
        let parser = Parser::new(fixture.validator());
        let mut rng = StdRng::seed_from_u64(3);
        parser.parse_dir(dir.path(), &mut rng)
    }

    #[test]
    fn parses_yaml_and_json_files() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.yml", &format!("first:\n{ADMIT_AND_DISCHARGE}"));
        write(
            &dir,
            "b.json",
            r#"{"second": {"percentage_of_patients": 10, "pathway": [{"discharge": {}}]}}"#,
        );
        write(&dir, "notes.txt", "not a pathway");

        let pathways = parse_dir(&dir).expect("valid directory");

        assert_eq!(pathways.len(), 2);
        assert_eq!(pathways["first"].name(), "first");
        assert_eq!(pathways["first"].message_count().unwrap(), 2);
        assert_eq!(pathways["second"].percentage.map(|p| p.value()), Some(10.0));
    }

    #[test]
    fn rejects_redeclared_pathways() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.yaml", &format!("dup:\n{ADMIT_AND_DISCHARGE}"));
        write(&dir, "b.yaml", &format!("dup:\n{ADMIT_AND_DISCHARGE}other:\n{ADMIT_AND_DISCHARGE}"));

        let err = parse_dir(&dir).expect_err("re-declared");

        assert!(matches!(err, PathwayError::RedeclaredPathways { names, .. } if names == ["dup"]));
    }

    #[test]
    fn lists_every_invalid_pathway() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "a.yaml",
            &format!("ok:\n{ADMIT_AND_DISCHARGE}empty_b:\n  pathway: []\nempty_a:\n  pathway: []\n"),
        );

        let err = parse_dir(&dir).expect_err("invalid pathways");

        assert!(matches!(err, PathwayError::InvalidPathways { names } if names == ["empty_a", "empty_b"]));
    }

    #[test]
    fn reports_unknown_field_path() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "a.yaml",
            "p:\n  pathway:\n    - admission:\n        loc: Renal\n        colour: red\n",
        );

        let err = parse_dir(&dir).expect_err("unknown field");

        let message = err.to_string();
        assert!(matches!(err, PathwayError::Decode(_)));
        assert!(message.contains("schema mismatch at p.pathway"), "{message}");
        assert!(message.contains("colour"), "{message}");
    }

    #[test]
    fn empty_directory_has_no_pathways() {
        let dir = TempDir::new().unwrap();
        write(&dir, "readme.md", "# pathways");

        let err = parse_dir(&dir).expect_err("no pathways");

        assert!(matches!(err, PathwayError::NoPathways { .. }));
    }

    #[test]
    fn missing_directory_fails_to_list() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        let fixture = Fixture::new();
        let mut rng = StdRng::seed_from_u64(3);

        let err = Parser::new(fixture.validator())
            .parse_dir(&missing, &mut rng)
            .expect_err("missing dir");

        assert!(matches!(err, PathwayError::DirList { .. }));
    }

    #[test]
    fn parses_single_bare_or_named_pathway() {
        let fixture = Fixture::new();
        let parser = Parser::new(fixture.validator());
        let mut rng = StdRng::seed_from_u64(3);

        let bare = parser
            .parse_single(b"pathway:\n  - discharge: {}\n", &mut rng)
            .expect("bare pathway");
        assert_eq!(bare.name(), UNKNOWN_PATHWAY_NAME);

        let named = parser
            .parse_single(
                br#"{"mine": {"pathway": [{"autogenerate": {"from": "0s", "to": "2h", "every": "1h", "result": {"order_profile": "UREA AND ELECTROLYTES"}}}]}}"#,
                &mut rng,
            )
            .expect("named pathway");
        assert_eq!(named.name(), "mine");
        assert!(!named.has_auto_generate());
        assert_eq!(named.pathway.len(), 5);
    }

    #[test]
    fn single_reports_the_broken_step_field() {
        let fixture = Fixture::new();
        let parser = Parser::new(fixture.validator());
        let mut rng = StdRng::seed_from_u64(3);
        let yaml = "pathway:\n  - admission:\n      loc: Renal\n  - discharge:\n      colour: red\n";

        let err = parser.parse_single(yaml.as_bytes(), &mut rng).expect_err("unknown field");

        let message = err.to_string();
        assert!(message.starts_with("Pathway schema mismatch at pathway[1]"), "{message}");
        assert!(message.contains("colour"), "{message}");
    }

    #[test]
    fn single_rejects_several_pathways() {
        let fixture = Fixture::new();
        let parser = Parser::new(fixture.validator());
        let mut rng = StdRng::seed_from_u64(3);
        let yaml = format!("a:\n{ADMIT_AND_DISCHARGE}b:\n{ADMIT_AND_DISCHARGE}");

        let err = parser.parse_single(yaml.as_bytes(), &mut rng).expect_err("two pathways");

        assert!(matches!(err, PathwayError::TooManyPathways(2)));
    }

    #[test]
    fn single_rejects_invalid_pathway() {
        let fixture = Fixture::new();
        let parser = Parser::new(fixture.validator());
        let mut rng = StdRng::seed_from_u64(3);

        let err = parser
            .parse_single(b"pathway:\n  - admission:\n      loc: Nowhere\n", &mut rng)
            .expect_err("unknown location");

        assert!(matches!(err, PathwayError::InvalidPathway { name, .. } if name == UNKNOWN_PATHWAY_NAME));
    }
}
