//! End-to-end tests: generate, annotate and coverage against a sample header

use fwmap::{
    annotate_documents, coverage_report, discover_headers, find_documents, generate_batch,
    Annotator, HeaderJob, MappingConfig, MappingGenerator, MappingTables, ScanFilter,
};
use fwmap_header::parse_header_file;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const FIXTURE: &str = include_str!("fixtures/Configuration.h");

struct Workspace {
    dir: TempDir,
    header: PathBuf,
    config: MappingConfig,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let header = dir.path().join("Configuration.h");
        fs::write(&header, FIXTURE).unwrap();
        let config = MappingConfig::new("marlin", "2.1.x").with_output_dir(dir.path().join("maps"));
        Self {
            dir,
            header,
            config,
        }
    }

    fn maps_dir(&self) -> PathBuf {
        self.config.version_dir()
    }

    fn core_path(&self) -> PathBuf {
        self.maps_dir().join("core/marlin-config-mapping-core.json")
    }

    fn full_path(&self) -> PathBuf {
        self.maps_dir().join("full/marlin-config-mapping-full.json")
    }

    fn generate(&self, tables: &MappingTables) {
        MappingGenerator::new(&self.config, tables)
            .generate_file(&self.header)
            .unwrap();
    }
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn category_keys(document: &Value) -> Vec<String> {
    document
        .as_object()
        .unwrap()
        .keys()
        .filter(|k| !fwmap::document::is_metadata_key(k))
        .cloned()
        .collect()
}

#[test]
fn test_generate_writes_core_and_full() {
    let ws = Workspace::new();
    let tables = MappingTables::builtin().unwrap();

    let summary = MappingGenerator::new(&ws.config, &tables)
        .generate_file(&ws.header)
        .unwrap();

    assert_eq!(summary.outputs, vec![ws.core_path(), ws.full_path()]);
    assert_eq!(summary.fields_categorized, summary.defines_found);
    assert!(summary.core_fields < summary.fields_categorized);

    let full = read_json(&ws.full_path());
    assert_eq!(full["$schema"], "Marlin Configuration Field Mapping");
    assert_eq!(full["configFile"], "Configuration.h");
    assert_eq!(full["totalDefines"], summary.defines_found);
    assert_eq!(full["fullDefines"], summary.fields_categorized);

    let keys: Vec<_> = full.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys[0], "$schema");
    assert_eq!(keys.last().unwrap(), "fullDefines");

    let text = fs::read_to_string(ws.full_path()).unwrap();
    assert!(text.ends_with("}\n"));
    assert!(text.starts_with("{\n  \"$schema\""));
}

#[test]
fn test_core_is_subset_of_full() {
    let ws = Workspace::new();
    let tables = MappingTables::builtin().unwrap();
    ws.generate(&tables);

    let core = read_json(&ws.core_path());
    let full = read_json(&ws.full_path());

    for category in category_keys(&core) {
        let core_fields = core[&category].as_object().unwrap();
        assert!(!core_fields.is_empty(), "empty category {category} in core");
        for (key, entry) in core_fields {
            let full_entry = &full[&category][key];
            assert_eq!(full_entry["mapsFrom"], entry["mapsFrom"]);
            let name = entry["mapsFrom"][0].as_str().unwrap();
            assert!(tables.is_essential(name), "{name} is not essential");
        }
    }

    assert!(category_keys(&core).len() <= category_keys(&full).len());
}

#[test]
fn test_bltouch_entry() {
    let ws = Workspace::new();
    let tables = MappingTables::builtin().unwrap();
    ws.generate(&tables);

    let full = read_json(&ws.full_path());
    let entry = &full["probe"]["bltouch"];
    assert_eq!(entry["mapsFrom"], json!(["BLTOUCH"]));
    assert_eq!(entry["type"], "boolean");
    assert_eq!(entry["required"], false);
    assert_eq!(entry["isConditional"], false);
    assert_eq!(entry["notes"], "Use this for BLTouch probes");
    assert!(entry.get("unit").is_none());
    assert!(entry.get("uiFieldId").is_none());

    let core = read_json(&ws.core_path());
    assert_eq!(core["probe"]["bltouch"]["uiFieldId"], "probeTypeBLTouch");
}

#[test]
fn test_delta_entry() {
    let ws = Workspace::new();
    let tables = MappingTables::builtin().unwrap();
    ws.generate(&tables);

    let full = read_json(&ws.full_path());
    // BED_ is a temperature keyword and that rule comes first
    let entry = &full["temperature"]["xBedSize"];
    assert_eq!(entry["type"], "integer");
    assert_eq!(entry["isConditional"], true);
    assert_eq!(entry["conditionalOn"], json!([]));
    assert_eq!(entry["conditionalOnNot"], json!(["DELTA"]));
    assert_eq!(entry["conditionalExpression"], json!(["DELTA"]));
    assert_eq!(entry["unit"], "mm");
    assert_eq!(entry["examples"], json!(["220"]));
}

#[test]
fn test_validation_reaches_documents() {
    let ws = Workspace::new();
    let tables = MappingTables::builtin().unwrap();
    ws.generate(&tables);

    let full = read_json(&ws.full_path());
    assert_eq!(full["basic"]["baudrate"]["allowedValues"], json!([115200, 250000]));
    assert_eq!(full["hardware"]["heater0Maxtemp"]["min"], 0);
    assert_eq!(full["hardware"]["heater0Maxtemp"]["max"], 300);
    assert_eq!(full["hardware"]["heater0Maxtemp"]["unit"], "°C");
    assert_eq!(full["features"]["eepromSettings"]["requires"], json!(["EEPROM_CHITCHAT"]));
}

#[test]
fn test_generation_is_deterministic() {
    let ws = Workspace::new();
    let tables = MappingTables::builtin().unwrap();

    ws.generate(&tables);
    let first = fs::read(ws.full_path()).unwrap();
    ws.generate(&tables);
    let second = fs::read(ws.full_path()).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_annotate_after_generate_changes_nothing() {
    let ws = Workspace::new();
    let tables = MappingTables::builtin().unwrap();
    ws.generate(&tables);

    let core_before = fs::read(ws.core_path()).unwrap();
    let full_before = fs::read(ws.full_path()).unwrap();

    let header = parse_header_file(&ws.header, ws.config.max_file_size).unwrap();

    let documents = find_documents(&ws.maps_dir(), "**/*.json").unwrap();
    assert_eq!(documents.len(), 2);
    let report = annotate_documents(&Annotator::new(&header, &tables, false), &documents);
    assert!(!report.has_failures());
    assert!(report.successes.iter().all(|s| s.fields_updated == 0));

    let core_only = find_documents(&ws.maps_dir(), "core/*.json").unwrap();
    let report = annotate_documents(&Annotator::new(&header, &tables, true), &core_only);
    assert_eq!(report.successes[0].fields_updated, 0);

    assert_eq!(fs::read(ws.core_path()).unwrap(), core_before);
    assert_eq!(fs::read(ws.full_path()).unwrap(), full_before);
}

#[test]
fn test_annotate_preserves_hand_edits() {
    let ws = Workspace::new();
    let tables = MappingTables::builtin().unwrap();
    let path = ws.dir.path().join("edited-mapping.json");
    fs::write(
        &path,
        serde_json::to_string_pretty(&json!({
            "$schema": "Marlin Configuration Field Mapping",
            "geometry": {
                "bedWidth": {
                    "mapsFrom": ["X_BED_SIZE"],
                    "type": "integer",
                    "label": "Bed width",
                    "notes": "Measured by hand"
                }
            }
        }))
        .unwrap(),
    )
    .unwrap();

    let header = parse_header_file(&ws.header, ws.config.max_file_size).unwrap();
    let report = annotate_documents(&Annotator::new(&header, &tables, true), &[path.clone()]);
    assert_eq!(report.successes[0].fields_updated, 1);

    let document = read_json(&path);
    let entry = &document["geometry"]["bedWidth"];
    assert_eq!(entry["label"], "Bed width");
    assert_eq!(entry["notes"], "Measured by hand");
    assert_eq!(entry["conditionalOnNot"], json!(["DELTA"]));
    assert_eq!(entry["unit"], "mm");
    assert_eq!(entry["uiFieldId"], "bedSizeX");
}

#[test]
fn test_malformed_document_fails_alone() {
    let ws = Workspace::new();
    let tables = MappingTables::builtin().unwrap();
    ws.generate(&tables);

    let broken = ws.maps_dir().join("full/broken-mapping.json");
    fs::write(&broken, "{ \"basic\": ").unwrap();

    let header = parse_header_file(&ws.header, ws.config.max_file_size).unwrap();
    let documents = find_documents(&ws.maps_dir(), "**/*.json").unwrap();
    let report = annotate_documents(&Annotator::new(&header, &tables, true), &documents);

    assert_eq!(report.total(), 3);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, broken);
    assert!(report.failures[0].1.contains("Malformed"));
    assert_eq!(report.successes.len(), 2);
}

#[test]
fn test_batch_continues_past_bad_headers() {
    let scan = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();

    let good = scan.path().join("marlin/2.1.x");
    fs::create_dir_all(&good).unwrap();
    fs::write(good.join("Configuration.h"), FIXTURE).unwrap();

    let big = scan.path().join("th3d/2.97a");
    fs::create_dir_all(&big).unwrap();
    fs::write(big.join("Configuration.h"), "// padding\n".repeat(1024)).unwrap();

    let (mut jobs, failures) = discover_headers(scan.path(), &ScanFilter::default()).unwrap();
    assert!(failures.is_empty());
    assert_eq!(jobs.len(), 2);
    jobs.push(HeaderJob {
        firmware: "marlin".into(),
        version: "2.1.x".into(),
        path: scan.path().join("marlin/2.1.x/Configuration_missing.h"),
    });

    let base = MappingConfig::default()
        .with_output_dir(out.path())
        .with_max_file_size(8 * 1024);
    let tables = MappingTables::builtin().unwrap();
    let report = generate_batch(&jobs, &base, &tables);

    assert_eq!(report.successes.len(), 1);
    assert_eq!(report.failures.len(), 2);
    assert!(out
        .path()
        .join("marlin/2.1.x/full/marlin-config-mapping-full.json")
        .is_file());
    assert!(!out.path().join("th3d").exists());
}

#[test]
fn test_small_line_budget_numbers_parts() {
    let ws = Workspace::new();
    let tables = MappingTables::builtin().unwrap();
    let config = ws.config.clone().with_max_lines(80);

    let summary = MappingGenerator::new(&config, &tables)
        .generate_file(&ws.header)
        .unwrap();

    let full_parts: Vec<_> = summary
        .outputs
        .iter()
        .filter(|p| p.parent().unwrap().ends_with("full"))
        .collect();
    assert!(full_parts.len() > 1);
    assert!(full_parts[0]
        .file_name()
        .unwrap()
        .to_str()
        .unwrap()
        .ends_with("-mapping-full-part1.json"));

    let total: u64 = full_parts
        .iter()
        .map(|p| read_json(p)["fullDefines"].as_u64().unwrap())
        .max()
        .unwrap();
    assert_eq!(total as usize, summary.fields_categorized);
}

#[test]
fn test_coverage_after_generate_is_complete() {
    let ws = Workspace::new();
    let tables = MappingTables::builtin().unwrap();
    ws.generate(&tables);

    let documents = find_documents(&ws.maps_dir(), "full/*.json").unwrap();
    let report = coverage_report(
        &[ws.header.clone()],
        &documents,
        ws.config.max_file_size,
        &tables,
    )
    .unwrap();

    assert!(report.total_active > 0);
    assert_eq!(report.mapped_active, report.total_active);
    assert_eq!(report.coverage_percent, 100.0);
    assert!(report.unmapped.is_empty());
}
