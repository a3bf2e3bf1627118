use std::fs;
use std::path::Path;

use filetime::FileTime;
use pathsel::{
    ContainsSelector, CustomSelector, DateSelector, DependSelector, DepthSelector, FileSet,
    FilenameSelector, LogicSelector, Logic, Mapper, ModifiedSelector, Project, PresentSelector,
    Resource, ResourceCollection, SelectError, Selector, SelectorContainer, SizeSelector,
    TypeSelector,
};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Entry names of the depth fixture; the last one is a directory.
const DEPTH_FIXTURE: &[&str] = &[
    ".",
    "asf-logo.gif.md5",
    "asf-logo.gif.bz2",
    "asf-logo.gif.gz",
    "copy.filterset.filtered",
    "zip/asf-logo.gif.zip",
    "tar/asf-logo.gif.tar",
    "tar/asf-logo-huge.tar.gz",
    "tar/gz/asf-logo.gif.tar.gz",
    "tar/bz2/asf-logo.gif.tar.bz2",
    "tar/bz2/asf-logo-huge.tar.bz2",
    "tar/bz2",
];

/// Create the depth fixture on disk.
fn setup_depth_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for name in &DEPTH_FIXTURE[1..DEPTH_FIXTURE.len() - 1] {
        let path = dir.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, name.as_bytes()).unwrap();
    }
    dir
}

/// Evaluate `selector` over `names` and render the outcome as `T`/`F`.
fn selection_string(project: &Project, base: &Path, selector: &Selector, names: &[&str]) -> String {
    names
        .iter()
        .map(|name| {
            let resource = Resource::from_path(Some(base), name, base.join(name));
            if selector.is_selected(project, base, name, &resource).unwrap() {
                'T'
            } else {
                'F'
            }
        })
        .collect()
}

fn resource(base: &Path, name: &str) -> Resource {
    Resource::from_path(Some(base), name, base.join(name))
}

fn selected(project: &Project, base: &Path, selector: impl Into<Selector>, name: &str) -> Result<bool, SelectError> {
    selector.into().is_selected(project, base, name, &resource(base, name))
}

fn set_mtime(path: &Path, secs: i64) {
    filetime::set_file_mtime(path, FileTime::from_unix_time(secs, 0)).unwrap();
}

fn file_names(set: &FileSet, project: &Project) -> Vec<String> {
    let mut names: Vec<String> = set
        .resources(project)
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    names.sort();
    names
}

// ---------------------------------------------------------------------------
// Depth
// ---------------------------------------------------------------------------

#[test]
fn depth_selects_by_directory_level() {
    let dir = setup_depth_dir();
    let project = Project::new(dir.path());

    let mut exactly_one = DepthSelector::new();
    exactly_one.set_min(1);
    exactly_one.set_max(1);
    assert_eq!(
        selection_string(&project, dir.path(), &exactly_one.into(), DEPTH_FIXTURE),
        "FFFFFTTTFFFT"
    );

    let mut top = DepthSelector::new();
    top.set_max(0);
    assert_eq!(
        selection_string(&project, dir.path(), &top.into(), DEPTH_FIXTURE),
        "TTTTTFFFFFFF"
    );

    let mut deep = DepthSelector::new();
    deep.set_min(2);
    assert_eq!(
        selection_string(&project, dir.path(), &deep.into(), DEPTH_FIXTURE),
        "FFFFFFFFTTTF"
    );
}

#[test]
fn depth_validation_is_lazy() {
    let dir = setup_depth_dir();
    let project = Project::new(dir.path());

    let err = selected(&project, dir.path(), DepthSelector::new(), "tar").unwrap_err();
    assert_eq!(
        err.to_string(),
        "You must set at least one of the min or the max levels."
    );

    let mut inverted = DepthSelector::new();
    inverted.set_min(3);
    inverted.set_max(1);
    let err = selected(&project, dir.path(), inverted, "tar").unwrap_err();
    assert_eq!(err.to_string(), "The maximum depth is lower than the minimum.");
}

#[test]
fn depth_in_a_fileset_scan() {
    let dir = setup_depth_dir();
    let project = Project::new(dir.path());

    let mut depth = DepthSelector::new();
    depth.set_min(1);
    depth.set_max(1);
    let mut set = FileSet::new();
    set.set_dir(".").unwrap();
    set.add_selector(depth).unwrap();

    assert_eq!(
        file_names(&set, &project),
        vec!["tar/asf-logo-huge.tar.gz", "tar/asf-logo.gif.tar", "zip/asf-logo.gif.zip"]
    );
}

// ---------------------------------------------------------------------------
// Size
// ---------------------------------------------------------------------------

fn setup_size_dir() -> (tempfile::TempDir, Vec<&'static str>) {
    let dir = tempfile::tempdir().unwrap();
    let files = [("s6999", 6999), ("s7000", 7000), ("s7100", 7100), ("s7168", 7168), ("s7200", 7200)];
    for (name, len) in files {
        fs::write(dir.path().join(name), vec![b'x'; len]).unwrap();
    }
    (dir, files.iter().map(|(n, _)| *n).collect())
}

fn size(value: i64, units: &str, when: &str) -> Selector {
    let mut s = SizeSelector::new();
    s.set_value(value);
    s.set_units(units).unwrap();
    s.set_when(when).unwrap();
    s.into()
}

#[test]
fn size_decimal_and_binary_units() {
    let (dir, names) = setup_size_dir();
    let project = Project::new(dir.path());

    assert_eq!(selection_string(&project, dir.path(), &size(7, "K", "more"), &names), "FFTTT");
    assert_eq!(selection_string(&project, dir.path(), &size(7, "Ki", "more"), &names), "FFFFT");
    assert_eq!(selection_string(&project, dir.path(), &size(7, "K", "equal"), &names), "FTFFF");
    assert_eq!(selection_string(&project, dir.path(), &size(7, "Ki", "equal"), &names), "FFFTF");
    assert_eq!(selection_string(&project, dir.path(), &size(7, "Ki", "less"), &names), "TTTFF");
}

#[test]
fn size_always_selects_directories() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    let project = Project::new(dir.path());

    assert!(selected(&project, dir.path(), size(1, "", "less"), "sub").unwrap());
}

#[test]
fn size_requires_a_value() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("f"), "x").unwrap();
    let project = Project::new(dir.path());

    let err = selected(&project, dir.path(), SizeSelector::new(), "f").unwrap_err();
    assert_eq!(
        err.to_string(),
        "The value attribute is required, and must be positive"
    );

    let mut negative = SizeSelector::new();
    negative.set_value(-1);
    assert!(matches!(
        selected(&project, dir.path(), negative, "f"),
        Err(SelectError::Validation(_))
    ));
}

// ---------------------------------------------------------------------------
// Date and depend
// ---------------------------------------------------------------------------

#[test]
fn date_compares_modification_times() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("stamp.txt");
    fs::write(&file, "stamp").unwrap();
    set_mtime(&file, 1_000_000_000);
    let project = Project::new(dir.path());

    let date = |millis: i64, when: &str, granularity: i64| {
        let mut d = DateSelector::new();
        d.set_millis(millis);
        d.set_when(when).unwrap();
        d.set_granularity(granularity);
        d
    };

    let exact = 1_000_000_000_000;
    assert!(selected(&project, dir.path(), date(exact, "equal", 0), "stamp.txt").unwrap());
    assert!(selected(&project, dir.path(), date(exact + 5000, "before", 1000), "stamp.txt").unwrap());
    assert!(!selected(&project, dir.path(), date(exact + 5000, "after", 1000), "stamp.txt").unwrap());
    assert!(selected(&project, dir.path(), date(exact + 500, "equal", 1000), "stamp.txt").unwrap());
    assert!(!selected(&project, dir.path(), date(exact + 500, "equal", 0), "stamp.txt").unwrap());
}

#[test]
fn date_window_yields_exactly_one_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("stamp.txt");
    fs::write(&file, "stamp").unwrap();
    set_mtime(&file, 1_000_000);
    let project = Project::new(dir.path());

    let outcomes = |millis: i64| -> Vec<bool> {
        ["before", "equal", "after"]
            .iter()
            .map(|when| {
                let mut d = DateSelector::new();
                d.set_millis(millis);
                d.set_when(when).unwrap();
                d.set_granularity(1000);
                selected(&project, dir.path(), d, "stamp.txt").unwrap()
            })
            .collect()
    };

    let stamp = 1_000_000_000;
    assert_eq!(outcomes(stamp), vec![false, true, false]);
    assert_eq!(outcomes(stamp - 500), vec![false, true, false]);
    assert_eq!(outcomes(stamp + 1000), vec![false, true, false]);
    assert_eq!(outcomes(stamp + 1001), vec![true, false, false]);
    assert_eq!(outcomes(stamp - 1001), vec![false, false, true]);
}

#[test]
fn date_checks_directories_only_when_asked() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    set_mtime(&dir.path().join("sub"), 1_000_000);
    let project = Project::new(dir.path());

    let mut after = DateSelector::new();
    after.set_millis(2_000_000_000);
    after.set_when("after").unwrap();
    assert!(selected(&project, dir.path(), after.clone(), "sub").unwrap());

    after.set_check_dirs(true);
    assert!(!selected(&project, dir.path(), after.clone(), "sub").unwrap());

    let mut before = after;
    before.set_when("before").unwrap();
    assert!(selected(&project, dir.path(), before, "sub").unwrap());
}

#[test]
fn date_requires_an_instant() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("f"), "x").unwrap();
    let project = Project::new(dir.path());

    let err = selected(&project, dir.path(), DateSelector::new(), "f").unwrap_err();
    assert_eq!(
        err.to_string(),
        "You must provide a datetime or the number of milliseconds."
    );
}

/// Sources under `src/`, class files under `classes/`:
/// `a.class` is newer than `a.java`, `b.class` older than `b.java`,
/// `c.java` has no class file.
fn setup_build_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    let classes = dir.path().join("classes");
    fs::create_dir(&src).unwrap();
    fs::create_dir(&classes).unwrap();
    for name in ["a.java", "b.java", "c.java"] {
        fs::write(src.join(name), name).unwrap();
        set_mtime(&src.join(name), 2_000_000_000);
    }
    fs::write(classes.join("a.class"), "a").unwrap();
    set_mtime(&classes.join("a.class"), 2_000_010_000);
    fs::write(classes.join("b.class"), "b").unwrap();
    set_mtime(&classes.join("b.class"), 1_900_000_000);
    dir
}

#[test]
fn depend_selects_out_of_date_sources() {
    let dir = setup_build_dir();
    let project = Project::new(dir.path());

    let mut depend = DependSelector::new();
    depend.set_target_dir("classes");
    depend.add_mapper(Mapper::glob("*.java", "*.class"));

    let mut set = FileSet::new();
    set.set_dir("src").unwrap();
    set.add_selector(depend).unwrap();
    assert_eq!(file_names(&set, &project), vec!["b.java", "c.java"]);
}

#[test]
fn depend_needs_a_target_dir_and_one_mapper() {
    let dir = setup_build_dir();
    let project = Project::new(dir.path());
    let src = dir.path().join("src");

    let err = selected(&project, &src, DependSelector::new(), "a.java").unwrap_err();
    assert_eq!(err.to_string(), "The targetdir attribute is required.");

    let mut two = DependSelector::new();
    two.set_target_dir("classes");
    two.add_mapper(Mapper::Identity);
    two.add_mapper(Mapper::Flatten);
    let err = selected(&project, &src, two, "a.java").unwrap_err();
    assert_eq!(err.to_string(), "Cannot define more than one mapper");
}

#[test]
fn present_both_and_srconly() {
    let dir = setup_build_dir();
    let project = Project::new(dir.path());

    let present = |mode: &str| {
        let mut p = PresentSelector::new();
        p.set_target_dir("classes");
        p.add_mapper(Mapper::glob("*.java", "*.class"));
        p.set_present(mode).unwrap();
        let mut set = FileSet::new();
        set.set_dir("src").unwrap();
        set.add_selector(p).unwrap();
        file_names(&set, &project)
    };

    assert_eq!(present("both"), vec!["a.java", "b.java"]);
    assert_eq!(present("srconly"), vec!["c.java"]);
    assert!(PresentSelector::new().set_present("sometimes").is_err());
}

// ---------------------------------------------------------------------------
// Content, name and type
// ---------------------------------------------------------------------------

#[test]
fn contains_matches_text() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("upper.txt"), "Hello World").unwrap();
    fs::write(dir.path().join("spaced.txt"), "hel lo\nworld").unwrap();
    let project = Project::new(dir.path());

    let contains = |text: &str, case_sensitive: bool, ignore_ws: bool| {
        let mut c = ContainsSelector::new();
        c.set_text(text);
        c.set_case_sensitive(case_sensitive);
        c.set_ignore_whitespace(ignore_ws);
        c
    };

    assert!(selected(&project, dir.path(), contains("World", true, false), "upper.txt").unwrap());
    assert!(!selected(&project, dir.path(), contains("world", true, false), "upper.txt").unwrap());
    assert!(selected(&project, dir.path(), contains("world", false, false), "upper.txt").unwrap());
    assert!(!selected(&project, dir.path(), contains("helloworld", true, false), "spaced.txt").unwrap());
    assert!(selected(&project, dir.path(), contains("helloworld", true, true), "spaced.txt").unwrap());

    let err = selected(&project, dir.path(), ContainsSelector::new(), "upper.txt").unwrap_err();
    assert_eq!(err.to_string(), "The text attribute is required");
}

#[test]
fn filename_and_type_selectors() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("lib")).unwrap();
    fs::write(dir.path().join("lib").join("core.jar"), "jar").unwrap();
    let project = Project::new(dir.path());

    let mut jars = FilenameSelector::new();
    jars.set_name("**/*.jar");
    assert!(selected(&project, dir.path(), jars.clone(), "lib/core.jar").unwrap());
    jars.set_negate(true);
    assert!(!selected(&project, dir.path(), jars, "lib/core.jar").unwrap());

    let mut dirs = TypeSelector::new();
    dirs.set_type("dir").unwrap();
    assert!(selected(&project, dir.path(), dirs.clone(), "lib").unwrap());
    assert!(!selected(&project, dir.path(), dirs, "lib/core.jar").unwrap());
    assert!(TypeSelector::new().set_type("link").is_err());
}

// ---------------------------------------------------------------------------
// Logic and references
// ---------------------------------------------------------------------------

fn name_is(pattern: &str) -> Selector {
    let mut s = FilenameSelector::new();
    s.set_name(pattern);
    s.into()
}

#[test]
fn boolean_combinators() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "a").unwrap();
    let project = Project::new(dir.path());
    let yes = || name_is("a.txt");
    let no = || name_is("b.txt");

    assert!(selected(&project, dir.path(), Selector::and(vec![yes(), yes()]), "a.txt").unwrap());
    assert!(!selected(&project, dir.path(), Selector::and(vec![yes(), no()]), "a.txt").unwrap());
    assert!(selected(&project, dir.path(), Selector::or(vec![no(), yes()]), "a.txt").unwrap());
    assert!(!selected(&project, dir.path(), Selector::not(yes()), "a.txt").unwrap());
    assert!(selected(&project, dir.path(), Selector::none(vec![no(), no()]), "a.txt").unwrap());
    assert!(selected(&project, dir.path(), Selector::majority(vec![yes(), yes(), no()]), "a.txt").unwrap());

    let tie = Selector::majority(vec![yes(), no()]);
    assert!(selected(&project, dir.path(), tie, "a.txt").unwrap());
    let mut strict = LogicSelector::with_children(Logic::Majority, vec![yes(), no()]);
    strict.set_allow_tie(false);
    assert!(!selected(&project, dir.path(), strict, "a.txt").unwrap());
}

#[test]
fn not_requires_exactly_one_child() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "a").unwrap();
    let project = Project::new(dir.path());

    let mut not = LogicSelector::new(Logic::Not);
    not.add_selector(name_is("a.txt"));
    not.add_selector(name_is("b.txt"));
    let err = selected(&project, dir.path(), not, "a.txt").unwrap_err();
    assert_eq!(
        err.to_string(),
        "One and only one selector is allowed within the <not> tag"
    );
}

#[test]
fn selector_reference_uses_the_named_container() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "a").unwrap();
    fs::write(dir.path().join("b.txt"), "b").unwrap();
    let mut project = Project::new(dir.path());

    let mut only_a = SelectorContainer::new();
    only_a.add_selector(name_is("a.txt")).unwrap();
    project.add_reference("only-a", only_a);

    let mut set = FileSet::new();
    set.set_dir(".").unwrap();
    set.add_selector(Selector::reference("only-a")).unwrap();
    assert_eq!(file_names(&set, &project), vec!["a.txt"]);
}

#[test]
fn selector_reference_cycles_are_detected() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "a").unwrap();
    for len in 1..=3 {
        let mut project = Project::new(dir.path());
        for i in 0..len {
            let mut container = SelectorContainer::new();
            container
                .add_selector(Selector::reference(&format!("s{}", (i + 1) % len)))
                .unwrap();
            project.add_reference(format!("s{i}"), container);
        }
        let err = selected(&project, dir.path(), Selector::reference("s0"), "a.txt").unwrap_err();
        assert!(
            matches!(err, SelectError::CircularReference(_)),
            "cycle of length {len} not detected: {err}"
        );
    }
}

// ---------------------------------------------------------------------------
// Modified
// ---------------------------------------------------------------------------

/// A project rooted at `tmp/` scanning `tmp/src/`, so the cache file
/// (`tmp/cache.properties`) stays outside the scanned tree.
fn setup_modified_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(src.join("sub")).unwrap();
    fs::write(src.join("a.txt"), "alpha").unwrap();
    fs::write(src.join("b.txt"), "beta").unwrap();
    fs::write(src.join("sub").join("c.txt"), "gamma").unwrap();
    dir
}

fn modified_set(selector: impl Into<Selector>) -> FileSet {
    let mut set = FileSet::new();
    set.set_dir("src").unwrap();
    set.add_selector(selector).unwrap();
    set
}

#[test]
fn modified_selects_only_changed_files() {
    let dir = setup_modified_dir();
    let project = Project::new(dir.path());
    let cache_file = dir.path().join("cache.properties");

    let selector = ModifiedSelector::new();
    let set = modified_set(selector.clone());

    assert_eq!(file_names(&set, &project), vec!["a.txt", "b.txt", "sub/c.txt"]);
    assert!(cache_file.exists());

    project.clear_scan_cache();
    assert!(file_names(&set, &project).is_empty());

    fs::write(dir.path().join("src").join("b.txt"), "beta, revised").unwrap();
    project.clear_scan_cache();
    assert_eq!(file_names(&set, &project), vec!["b.txt"]);

    selector.delete_cache().unwrap();
    assert!(!cache_file.exists());
}

#[test]
fn modified_cache_survives_a_new_selector() {
    let dir = setup_modified_dir();

    let first = Project::new(dir.path());
    assert_eq!(file_names(&modified_set(ModifiedSelector::new()), &first).len(), 3);

    let second = Project::new(dir.path());
    let selector = ModifiedSelector::new();
    assert!(file_names(&modified_set(selector.clone()), &second).is_empty());

    let key = dir.path().join("src").join("a.txt").display().to_string();
    assert!(selector.cached_keys().contains(&key));
    assert!(selector.cached_value(&key).is_some());
}

#[test]
fn modified_without_update_selects_everything_every_time() {
    let dir = setup_modified_dir();
    let project = Project::new(dir.path());

    let mut selector = ModifiedSelector::new();
    selector.set_update(false);
    let set = modified_set(selector);

    assert_eq!(file_names(&set, &project).len(), 3);
    project.clear_scan_cache();
    assert_eq!(file_names(&set, &project).len(), 3);
    assert!(!dir.path().join("cache.properties").exists());
}

#[test]
fn modified_immediate_update_writes_during_selection() {
    let dir = setup_modified_dir();
    let project = Project::new(dir.path());
    let src = dir.path().join("src");

    let mut selector = ModifiedSelector::new();
    selector.set_delay_update(false);
    selector.set_cache_file("state/modified.properties");
    let selector: Selector = selector.into();

    assert!(selector.is_selected(&project, &src, "a.txt", &resource(&src, "a.txt")).unwrap());
    assert!(dir.path().join("state").join("modified.properties").exists());
    assert!(!selector.is_selected(&project, &src, "a.txt", &resource(&src, "a.txt")).unwrap());
}

#[test]
fn modified_directories_follow_seldirs() {
    let dir = setup_modified_dir();
    let project = Project::new(dir.path());
    let src = dir.path().join("src");

    let mut selector = ModifiedSelector::new();
    selector.set_cache("memory").unwrap();
    assert!(selected(&project, &src, selector.clone(), "sub").unwrap());
    selector.set_select_dirs(false);
    assert!(!selected(&project, &src, selector, "sub").unwrap());
}

#[test]
fn modified_rejects_unknown_settings() {
    let dir = setup_modified_dir();
    let project = Project::new(dir.path());
    let src = dir.path().join("src");

    let mut selector = ModifiedSelector::new();
    assert!(selector.set_cache("database").is_err());
    assert!(selector.set_algorithm("crc").is_err());
    assert!(selector.set_comparator("fuzzy").is_err());

    selector.add_param("colour", "blue");
    let err = selected(&project, &src, selector, "a.txt").unwrap_err();
    assert_eq!(err.to_string(), "Invalid parameter colour");
}

#[test]
fn modified_by_classname_with_params() {
    let dir = setup_modified_dir();
    let project = Project::new(dir.path());

    let mut custom = CustomSelector::new();
    custom.set_classname("modified");
    custom.add_param("cache", "memory");
    custom.add_param("algorithm", "hashvalue");
    let set = modified_set(custom);

    assert_eq!(file_names(&set, &project).len(), 3);
    project.clear_scan_cache();
    assert!(file_names(&set, &project).is_empty());
    assert!(!dir.path().join("cache.properties").exists());
}

#[test]
fn modified_with_each_digest() {
    for digest in ["MD5", "SHA", "SHA-256"] {
        let dir = setup_modified_dir();
        let project = Project::new(dir.path());

        let mut selector = ModifiedSelector::new();
        selector.set_cache("memory").unwrap();
        selector.set_digest(digest).unwrap();
        let set = modified_set(selector);

        assert_eq!(file_names(&set, &project).len(), 3, "{digest}");
        project.clear_scan_cache();
        assert!(file_names(&set, &project).is_empty(), "{digest}");
    }
}

#[test]
fn modified_with_each_checksum() {
    for checksum in ["CRC", "ADLER"] {
        let dir = setup_modified_dir();
        let project = Project::new(dir.path());

        let mut selector = ModifiedSelector::new();
        selector.set_cache("memory").unwrap();
        selector.set_algorithm("checksum").unwrap();
        selector.set_checksum(checksum).unwrap();
        let set = modified_set(selector.clone());

        assert_eq!(file_names(&set, &project).len(), 3, "{checksum}");
        project.clear_scan_cache();
        assert!(file_names(&set, &project).is_empty(), "{checksum}");

        fs::write(dir.path().join("src").join("a.txt"), "alphabet").unwrap();
        project.clear_scan_cache();
        assert_eq!(file_names(&set, &project), vec!["a.txt"], "{checksum}");

        let key = dir.path().join("src").join("a.txt").display().to_string();
        let value = selector.cached_value(&key).unwrap();
        assert!(value.parse::<u32>().is_ok(), "{checksum}: {value}");
    }
}

#[test]
fn modified_by_last_modified_ignores_content() {
    let dir = setup_modified_dir();
    let src = dir.path().join("src");
    for name in ["a.txt", "b.txt", "sub/c.txt"] {
        set_mtime(&src.join(name), 1_000_000_000);
    }
    let project = Project::new(dir.path());

    let mut selector = ModifiedSelector::new();
    selector.set_cache("memory").unwrap();
    selector.set_algorithm("lastmodified").unwrap();
    let set = modified_set(selector.clone());

    assert_eq!(file_names(&set, &project).len(), 3);
    let key = src.join("a.txt").display().to_string();
    assert_eq!(selector.cached_value(&key).as_deref(), Some("1000000000000"));

    // Same timestamp, new content: not a change.
    fs::write(src.join("a.txt"), "omega").unwrap();
    set_mtime(&src.join("a.txt"), 1_000_000_000);
    project.clear_scan_cache();
    assert!(file_names(&set, &project).is_empty());

    set_mtime(&src.join("b.txt"), 1_000_000_100);
    project.clear_scan_cache();
    assert_eq!(file_names(&set, &project), vec!["b.txt"]);
}

// ---------------------------------------------------------------------------
// Custom selectors
// ---------------------------------------------------------------------------

#[test]
fn unknown_classname_is_reported_on_first_use() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "a").unwrap();
    let project = Project::new(dir.path());

    let mut custom = CustomSelector::new();
    custom.set_classname("org.example.Missing");
    let err = selected(&project, dir.path(), custom, "a.txt").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Selector org.example.Missing not initialized, no such class"
    );

    let err = selected(&project, dir.path(), CustomSelector::new(), "a.txt").unwrap_err();
    assert_eq!(err.to_string(), "The classname attribute is required");
}
