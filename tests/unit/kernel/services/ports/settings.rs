use super::*;

#[test]
fn defaults_follow_ripgrep_dialect() {
    let settings = Settings::default();
    assert_eq!(settings.engine.program, "rg");
    assert_eq!(settings.engine.json, "--json");
    assert_eq!(settings.thread_count, 4);
    assert_eq!(settings.min_term_len, 3);
    assert!(settings.show_result_notifications);
}

#[test]
fn partial_json_fills_in_defaults() {
    let settings: Settings =
        serde_json::from_str(r#"{"thread_count": 8, "engine": {"program": "/opt/rg"}}"#)
            .expect("deserialize Settings");
    assert_eq!(settings.thread_count, 8);
    assert_eq!(settings.engine.program, "/opt/rg");
    assert_eq!(settings.engine.pattern, "-e");
    assert_eq!(settings.min_term_len, 3);
}

#[test]
fn request_combines_roots_and_options() {
    let settings = Settings {
        search_roots: vec!["Assets".to_string()],
        thread_count: 0,
        ..Settings::default()
    };
    let options = SearchOptions {
        ignore_case: true,
        include_types: vec!["cs".to_string()],
        exclude_types: vec!["meta".to_string()],
        extra_roots: vec!["Packages".to_string(), "Assets".to_string()],
        ..SearchOptions::default()
    };

    let request = settings.request("guid", Some(PathBuf::from("/proj")), &options);

    assert_eq!(request.term, "guid");
    assert!(request.ignore_case);
    assert!(!request.literal);
    assert_eq!(request.search_roots, vec!["Assets", "Packages"]);
    assert!(request.include_globs.contains("cs"));
    assert!(request.exclude_globs.contains("meta"));
    assert_eq!(request.working_dir, Some(PathBuf::from("/proj")));
    assert_eq!(request.concurrency, 1);
}

#[test]
fn saved_searches_replace_by_name() {
    let mut settings = Settings::default();
    settings.add_saved_search(SavedSearch {
        name: "guids".to_string(),
        term: "guid:".to_string(),
        options: SearchOptions::default(),
    });
    settings.add_saved_search(SavedSearch {
        name: "guids".to_string(),
        term: "fileID".to_string(),
        options: SearchOptions::default(),
    });

    assert_eq!(settings.saved_searches.len(), 1);
    assert_eq!(settings.find_saved("guids").map(|s| s.term.as_str()), Some("fileID"));
    assert!(settings.remove_saved_search("guids"));
    assert!(!settings.remove_saved_search("guids"));
    assert!(settings.find_saved("guids").is_none());
}

#[test]
fn search_options_serde_skips_empty_lists() {
    let json = serde_json::to_string(&SearchOptions::default()).expect("serialize SearchOptions");
    assert!(!json.contains("include_types"));
    let decoded: SearchOptions = serde_json::from_str(&json).expect("deserialize SearchOptions");
    assert_eq!(decoded, SearchOptions::default());
}
