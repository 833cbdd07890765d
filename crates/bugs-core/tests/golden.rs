mod common;
use bugs_core::{parse_program, recognize, BugsError, World};

#[test]
fn test_samples_parse() {
    for sample in ["square", "chase", "lockstep", "faulty", "duplicate"] {
        let source = common::read_file(&format!("tests/samples/{}.bug", sample));
        assert!(recognize(&source).is_ok(), "{} should parse", sample);
    }
}

#[test]
fn test_chase_structure() {
    let source = common::read_file("tests/samples/chase.bug");
    let program = parse_program(&source).unwrap();

    assert_eq!(program.allbugs.variables[0].names, vec!["step"]);
    assert_eq!(program.allbugs.functions[0].name, "toward");
    let names: Vec<_> = program.bugs.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["Runner", "Chaser"]);
    assert_eq!(program.bugs[0].initially.statements.len(), 3);
    assert!(program.bugs[1].initially.is_empty());
}

#[test]
fn test_reparse_is_identical() {
    let source = common::read_file("tests/samples/lockstep.bug");
    assert_eq!(parse_program(&source).unwrap(), parse_program(&source).unwrap());
}

#[test]
fn test_syntax_error_reports_line() {
    let source = common::read_file("tests/samples/broken.bug");
    let err = parse_program(&source).unwrap_err();

    assert!(err.is_syntax());
    assert!(err.is_load_error());
    assert_eq!(err.to_string(), "Line 4: No comma following expression");
}

#[test]
fn test_duplicate_names_fail_load() {
    let source = common::read_file("tests/samples/duplicate.bug");
    let err = World::load(&source, common::quick_config()).err().unwrap();

    assert_eq!(err, BugsError::DuplicateAgentName("Twin".to_string()));
    assert!(err.is_load_error());
    assert!(!err.is_syntax());
}
