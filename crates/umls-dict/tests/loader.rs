use std::io::Write;
use std::path::PathBuf;

use tempfile::NamedTempFile;
use umls_dict::{ConceptTable, LoadMode, RareWordDictionary};
use umls_types::{Cui, SemanticGroup};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("terminology")
        .join(name)
}

#[test]
fn loads_dictionary_with_group_pragma() {
    let dict = RareWordDictionary::load(fixture("disorders.bsv")).expect("load dictionary");
    assert_eq!(dict.name(), "disorders");
    assert_eq!(dict.semantic_group(), SemanticGroup::Disorder);
    assert_eq!(dict.term_count(), 5);

    let cancer = dict.terms_for("cancer");
    assert_eq!(cancer.len(), 1);
    assert_eq!(cancer[0].text, "breast cancer");
    assert_eq!(cancer[0].token_count, 2);
    assert_eq!(cancer[0].anchor_index, 1);
    assert_eq!(cancer[0].cui, Cui::new(6142));

    let copd = dict.terms_for("disease");
    assert_eq!(copd[0].anchor_word(), "disease");
    assert_eq!(copd[0].token_count, 4);

    let single = dict.terms_for("hypertension");
    assert_eq!(single[0].token_count, 1);
    assert_eq!(single[0].anchor_index, 0);
}

#[test]
fn mmap_and_owned_modes_agree() {
    let mapped =
        RareWordDictionary::load_with_mode(fixture("disorders.bsv"), LoadMode::Mmap).unwrap();
    let owned =
        RareWordDictionary::load_with_mode(fixture("disorders.bsv"), LoadMode::Owned).unwrap();
    assert_eq!(mapped.term_count(), owned.term_count());
    assert_eq!(mapped.anchor_count(), owned.anchor_count());
    assert_eq!(mapped.terms_for("failure"), owned.terms_for("failure"));
}

#[test]
fn loads_concept_table_and_merges_rows() {
    let table = ConceptTable::load(fixture("concepts.bsv")).expect("load concepts");
    assert_eq!(table.len(), 4);

    let breast_ca = table.get(Cui::new(6142)).expect("merged concept");
    assert_eq!(
        breast_ca.preferred_text.as_deref(),
        Some("Malignant neoplasm of breast")
    );
    assert!(breast_ca.tuis.contains("T191"));
    assert_eq!(breast_ca.codes.len(), 2);
    assert!(breast_ca.codes["ICD10CM"].contains("C50"));

    let site = table.get(Cui::new(225_904)).expect("code-less concept");
    assert!(site.codes.is_empty());
    assert_eq!(
        site.groups().into_iter().collect::<Vec<_>>(),
        vec![SemanticGroup::AnatomicalSite]
    );

    assert!(table.get(Cui::new(999)).is_none());
}

#[test]
fn rejects_malformed_term_lines() {
    let mut file = NamedTempFile::new().expect("temp file");
    writeln!(file, "C0006142|9|2|breast cancer").unwrap();
    let err = RareWordDictionary::load_with_mode(file.path(), LoadMode::Owned)
        .expect_err("anchor index out of range must fail");
    assert!(err.to_string().contains(":1"), "error names the line: {err}");

    let mut file = NamedTempFile::new().expect("temp file");
    writeln!(file, "C0006142|1|3|breast cancer").unwrap();
    RareWordDictionary::load_with_mode(file.path(), LoadMode::Owned)
        .expect_err("token count mismatch must fail");
}

#[test]
fn rejects_unknown_group_pragma() {
    let mut file = NamedTempFile::new().expect("temp file");
    writeln!(file, ";;group=molecule").unwrap();
    writeln!(file, "C0006142|1|2|breast cancer").unwrap();
    RareWordDictionary::load_with_mode(file.path(), LoadMode::Owned)
        .expect_err("unknown group must fail");
}

#[test]
fn skips_comments_blank_lines_and_crlf() {
    let mut file = NamedTempFile::new().expect("temp file");
    write!(file, "# header\r\n\r\nC0006142|1|2|breast cancer\r\n").unwrap();
    let dict = RareWordDictionary::load_with_mode(file.path(), LoadMode::Owned).unwrap();
    assert_eq!(dict.term_count(), 1);
    assert_eq!(dict.semantic_group(), SemanticGroup::Unknown);
}
