use super::*;
use crate::filter::PatternFilter;
use crate::fs_interaction::virtual_fs::InMemoryFS;
use crate::monitor::{CancellationToken, NoProgress};
use crate::provider::PathListProvider;
use crate::workspace::{
    ChangeKinds, InMemoryWorkspace, ItemSet, PendOptions, PropertyValue, ServiceLevel,
    EXECUTABLE_KEY, PROPERTY_ENABLED,
};
use std::cell::Cell;

type TestSynchronizer<'a> =
    OfflineSynchronizer<'a, InMemoryWorkspace, PathListProvider, InMemoryFS>;

/// A workspace '$/proj' mapped to '/ws', disk and server in sync:
/// /ws, /ws/a.txt, /ws/sub, /ws/sub/b.txt
struct Fixture {
    fs: InMemoryFS,
    workspace: InMemoryWorkspace,
}

fn fixture() -> Fixture {
    let _ = env_logger::builder().is_test(true).try_init();

    let fixture = Fixture {
        fs: InMemoryFS::new(),
        workspace: InMemoryWorkspace::new("$/proj", "/ws"),
    };
    fixture.add_synced_dir("");
    fixture.add_synced_file("a.txt", b"a");
    fixture.add_synced_dir("sub");
    fixture.add_synced_file("sub/b.txt", b"b");

    fixture
}

impl Fixture {
    fn local(relative: &str) -> PathBuf {
        if relative.is_empty() {
            PathBuf::from("/ws")
        } else {
            Path::new("/ws").join(relative)
        }
    }

    fn server(relative: &str) -> String {
        if relative.is_empty() {
            String::from("$/proj")
        } else {
            format!("$/proj/{}", relative)
        }
    }

    fn add_synced_dir(&self, relative: &str) {
        self.fs.create_dir(Self::local(relative)).unwrap();
        self.workspace.add_folder(&Self::server(relative));
    }

    /// Checked in files are read-only on disk.
    fn add_synced_file(&self, relative: &str, content: &[u8]) {
        self.fs.create_file(Self::local(relative), content).unwrap();
        self.fs.set_read_only(Self::local(relative), true).unwrap();
        self.workspace.add_file(&Self::server(relative), content);
    }

    fn add_pending(&self, relative: &str, change_kinds: ChangeKinds, source: Option<&str>) {
        self.workspace.add_pending_change(PendingChange {
            local_item: Some(Self::local(relative)),
            server_item: Self::server(relative),
            source_server_item: source.map(String::from),
            change_kinds,
        });
    }

    fn synchronizer(&self) -> TestSynchronizer<'_> {
        let mut synchronizer = OfflineSynchronizer::with_fs(
            &self.workspace,
            PathListProvider::new(vec!["/ws"]),
            self.fs.clone(),
        );
        synchronizer.set_recursion_type(RecursionType::Full);
        synchronizer
    }

    fn detect(&self) -> Vec<OfflineChange> {
        self.synchronizer().detect_changes(&NoProgress).unwrap()
    }
}

fn summary(changes: &[OfflineChange]) -> Vec<(PathBuf, Vec<OfflineChangeType>)> {
    changes
        .iter()
        .map(|change| (change.local_path().to_path_buf(), change.change_types().to_vec()))
        .collect()
}

fn single(
    path: &str,
    change_types: &[OfflineChangeType],
) -> Vec<(PathBuf, Vec<OfflineChangeType>)> {
    vec![(PathBuf::from(path), change_types.to_vec())]
}

#[test]
fn unchanged_workspace_has_no_changes() {
    let fixture = fixture();
    assert!(fixture.detect().is_empty());
}

#[test]
fn detection_is_idempotent() {
    let fixture = fixture();
    fixture.fs.create_file("/ws/new.txt", b"new").unwrap();
    fixture.fs.set_read_only("/ws/a.txt", false).unwrap();
    fixture.fs.remove("/ws/sub/b.txt").unwrap();

    let mut synchronizer = fixture.synchronizer();
    let first = synchronizer.detect_changes(&NoProgress).unwrap();
    let second = synchronizer.detect_changes(&NoProgress).unwrap();

    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
    assert_eq!(synchronizer.changes(), &second[..]);
}

#[test]
fn detects_added_files() {
    let fixture = fixture();
    fixture.fs.create_file("/ws/new.txt", b"new").unwrap();

    let changes = fixture.detect();
    assert_eq!(summary(&changes), single("/ws/new.txt", &[OfflineChangeType::Add]));
    assert_eq!(changes[0].server_item_type(), None);

    let mut synchronizer = fixture.synchronizer();
    synchronizer.set_detect_added(false);
    assert!(synchronizer.detect_changes(&NoProgress).unwrap().is_empty());
}

#[test]
fn detects_added_directories_before_their_content() {
    let fixture = fixture();
    fixture.fs.create_dir("/ws/new").unwrap();
    fixture.fs.create_file("/ws/new/c.txt", b"c").unwrap();

    assert_eq!(
        summary(&fixture.detect()),
        vec![
            (PathBuf::from("/ws/new"), vec![OfflineChangeType::Add]),
            (PathBuf::from("/ws/new/c.txt"), vec![OfflineChangeType::Add]),
        ]
    );
}

#[test]
fn added_directories_are_ignored_without_add_detection() {
    let fixture = fixture();
    fixture.fs.create_dir("/ws/new").unwrap();
    fixture.fs.create_file("/ws/new/c.txt", b"c").unwrap();

    let mut synchronizer = fixture.synchronizer();
    synchronizer.set_detect_added(false);
    assert!(synchronizer.detect_changes(&NoProgress).unwrap().is_empty());
}

#[test]
fn writable_files_are_always_edited() {
    let fixture = fixture();
    fixture.fs.set_read_only("/ws/a.txt", false).unwrap();

    let changes = fixture.detect();
    assert_eq!(summary(&changes), single("/ws/a.txt", &[OfflineChangeType::Edit]));
    assert_eq!(changes[0].server_item_type(), Some(ItemType::File));

    let mut synchronizer = fixture.synchronizer();
    synchronizer.set_method(OfflineSynchronizerMethod::WritableFiles);
    assert_eq!(
        summary(&synchronizer.detect_changes(&NoProgress).unwrap()),
        single("/ws/a.txt", &[OfflineChangeType::Edit])
    );
}

#[test]
fn content_changes_depend_on_method() {
    let fixture = fixture();
    fixture
        .fs
        .test_set_file_content("/ws/sub/b.txt", b"changed".to_vec())
        .unwrap();

    assert_eq!(
        summary(&fixture.detect()),
        single("/ws/sub/b.txt", &[OfflineChangeType::Edit])
    );

    let mut synchronizer = fixture.synchronizer();
    synchronizer.set_method(OfflineSynchronizerMethod::WritableFiles);
    assert!(synchronizer.detect_changes(&NoProgress).unwrap().is_empty());
}

#[test]
fn detects_deletions_in_sorted_order() {
    let fixture = fixture();
    fixture.fs.remove("/ws/sub").unwrap();
    fixture.fs.remove("/ws/a.txt").unwrap();

    let changes = fixture.detect();
    assert_eq!(
        summary(&changes),
        vec![
            (PathBuf::from("/ws/a.txt"), vec![OfflineChangeType::Delete]),
            (PathBuf::from("/ws/sub"), vec![OfflineChangeType::Delete]),
            (PathBuf::from("/ws/sub/b.txt"), vec![OfflineChangeType::Delete]),
        ]
    );
    assert_eq!(changes[1].server_item_type(), Some(ItemType::Folder));
    assert_eq!(changes[2].server_item_type(), Some(ItemType::File));

    let mut synchronizer = fixture.synchronizer();
    synchronizer.set_detect_deleted(false);
    assert!(synchronizer.detect_changes(&NoProgress).unwrap().is_empty());
}

#[test]
fn missing_root_is_reported_as_deleted() {
    let fixture = fixture();
    fixture.fs.remove("/ws/sub").unwrap();

    let mut synchronizer = OfflineSynchronizer::with_fs(
        &fixture.workspace,
        PathListProvider::new(vec!["/ws/sub"]),
        fixture.fs.clone(),
    );
    let changes = synchronizer.detect_changes(&NoProgress).unwrap();

    assert_eq!(
        summary(&changes),
        vec![
            (PathBuf::from("/ws/sub"), vec![OfflineChangeType::Delete]),
            (PathBuf::from("/ws/sub/b.txt"), vec![OfflineChangeType::Delete]),
        ]
    );
}

#[test]
fn intermediate_server_directories_are_not_added() {
    let fixture = fixture();
    // Only the file is reported by the server, its parents are implied.
    fixture.workspace.add_file("$/proj/deep/er/c.txt", b"c");
    fixture.fs.create_dir("/ws/deep").unwrap();
    fixture.fs.create_dir("/ws/deep/er").unwrap();
    fixture.fs.create_file("/ws/deep/er/c.txt", b"c").unwrap();
    fixture.fs.set_read_only("/ws/deep/er/c.txt", true).unwrap();

    assert!(fixture.detect().is_empty());
}

struct SkipDirectory(PathBuf);

impl OfflineSynchronizerFilter for SkipDirectory {
    fn should_recurse(&self, directory: &Path) -> bool {
        directory != self.0
    }
}

#[test]
fn excluded_directories_never_report_deletions() {
    let fixture = fixture();
    fixture.workspace.add_file("$/proj/sub/only-on-server.txt", b"x");
    fixture.fs.remove("/ws/sub/b.txt").unwrap();
    fixture.fs.create_file("/ws/sub/new.txt", b"new").unwrap();

    let mut synchronizer = fixture.synchronizer();
    synchronizer.set_filter(SkipDirectory(PathBuf::from("/ws/sub")));
    assert!(synchronizer.detect_changes(&NoProgress).unwrap().is_empty());

    // Without the filter, everything below sub shows up.
    assert_eq!(fixture.detect().len(), 3);
}

#[test]
fn pattern_filter_hides_ignored_files() {
    let fixture = fixture();
    fixture.fs.create_file("/ws/scratch.tmp", b"tmp").unwrap();
    fixture.fs.create_file("/ws/new.txt", b"new").unwrap();

    let mut filter = PatternFilter::new("/ws");
    filter.add_ignore_rule(glob::Pattern::new("**/*.tmp").unwrap());
    let mut synchronizer = fixture.synchronizer();
    synchronizer.set_filter(filter);

    assert_eq!(
        summary(&synchronizer.detect_changes(&NoProgress).unwrap()),
        single("/ws/new.txt", &[OfflineChangeType::Add])
    );
}

#[test]
fn recursion_type_bounds_the_scan() {
    let fixture = fixture();
    fixture.fs.create_file("/ws/new.txt", b"new").unwrap();
    fixture.fs.create_file("/ws/sub/new.txt", b"new").unwrap();
    fixture.fs.remove("/ws/sub/b.txt").unwrap();

    let mut synchronizer = fixture.synchronizer();
    synchronizer.set_recursion_type(RecursionType::OneLevel);
    assert_eq!(
        summary(&synchronizer.detect_changes(&NoProgress).unwrap()),
        single("/ws/new.txt", &[OfflineChangeType::Add])
    );

    synchronizer.set_recursion_type(RecursionType::None);
    assert!(synchronizer.detect_changes(&NoProgress).unwrap().is_empty());
}

#[test]
fn detects_executable_changes() {
    let fixture = fixture();
    fixture.fs.create_file("/ws/run.sh", b"#!/bin/sh").unwrap();
    fixture.fs.set_executable("/ws/run.sh", true).unwrap();
    fixture.fs.set_executable("/ws/a.txt", true).unwrap();
    fixture
        .workspace
        .set_property("$/proj/sub/b.txt", EXECUTABLE_KEY, PROPERTY_ENABLED);

    let changes = fixture.detect();
    assert_eq!(
        summary(&changes),
        vec![
            (PathBuf::from("/ws/a.txt"), vec![OfflineChangeType::SetExecutable]),
            (
                PathBuf::from("/ws/run.sh"),
                vec![OfflineChangeType::Add, OfflineChangeType::SetExecutable]
            ),
            (PathBuf::from("/ws/sub/b.txt"), vec![OfflineChangeType::ClearExecutable]),
        ]
    );
    assert_eq!(changes[0].server_item_type(), Some(ItemType::File));
}

#[test]
fn old_servers_are_not_asked_for_properties() {
    let fixture = fixture();
    fixture.workspace.set_service_level(ServiceLevel::Tfs2010);
    fixture.fs.set_executable("/ws/a.txt", true).unwrap();

    assert!(fixture.detect().is_empty());
}

#[test]
fn content_and_property_tags_are_filtered_independently() {
    struct NoEdits;
    impl OfflineSynchronizerFilter for NoEdits {
        fn should_pend(
            &self,
            _path: &Path,
            change_type: OfflineChangeType,
            _server_item_type: Option<ItemType>,
        ) -> bool {
            change_type != OfflineChangeType::Edit
        }
    }

    let fixture = fixture();
    fixture.fs.set_read_only("/ws/a.txt", false).unwrap();
    fixture.fs.set_executable("/ws/a.txt", true).unwrap();

    let mut synchronizer = fixture.synchronizer();
    synchronizer.set_filter(NoEdits);
    assert_eq!(
        summary(&synchronizer.detect_changes(&NoProgress).unwrap()),
        single("/ws/a.txt", &[OfflineChangeType::SetExecutable])
    );

    assert_eq!(
        summary(&fixture.detect()),
        single(
            "/ws/a.txt",
            &[OfflineChangeType::Edit, OfflineChangeType::SetExecutable]
        )
    );
}

#[test]
fn detects_symlink_changes() {
    let fixture = fixture();
    fixture.workspace.add_symlink("$/proj/link", "a.txt");
    fixture.fs.create_symlink("/ws/link", "a.txt").unwrap();
    // Versioned as a regular file with the target as content.
    fixture.workspace.add_file("$/proj/was-file", b"sub/b.txt");
    fixture.fs.create_symlink("/ws/was-file", "sub/b.txt").unwrap();
    fixture.fs.create_symlink("/ws/new-link", "sub").unwrap();

    assert_eq!(
        summary(&fixture.detect()),
        vec![
            (
                PathBuf::from("/ws/new-link"),
                vec![OfflineChangeType::Add, OfflineChangeType::SetSymlink]
            ),
            (PathBuf::from("/ws/was-file"), vec![OfflineChangeType::SetSymlink]),
        ]
    );

    fixture.fs.remove("/ws/link").unwrap();
    fixture.fs.create_symlink("/ws/link", "sub").unwrap();
    let changes = fixture.detect();
    assert_eq!(
        changes[0].change_types(),
        &[OfflineChangeType::Edit],
        "A new link target must be an edit"
    );
    assert_eq!(changes[0].local_path(), Path::new("/ws/link"));
}

#[test]
fn symlinks_are_skipped_on_servers_without_support() {
    let fixture = fixture();
    fixture.workspace.set_service_level(ServiceLevel::Tfs2012);
    fixture.workspace.add_symlink("$/proj/link", "a.txt");
    fixture.fs.create_symlink("/ws/link", "elsewhere").unwrap();
    fixture.fs.create_symlink("/ws/new-link", "sub").unwrap();

    assert!(fixture.detect().is_empty());
}

#[test]
fn edits_already_pending_are_dropped() {
    let fixture = fixture();
    fixture.fs.set_read_only("/ws/a.txt", false).unwrap();
    fixture.add_pending("a.txt", ChangeKinds::EDIT, None);

    assert!(fixture.detect().is_empty());
}

#[test]
fn delete_of_pending_add_becomes_undo() {
    let fixture = fixture();
    fixture.workspace.add_file("$/proj/new.txt", b"new");
    fixture.add_pending("new.txt", ChangeKinds::ADD, None);

    assert_eq!(
        summary(&fixture.detect()),
        single("/ws/new.txt", &[OfflineChangeType::Undo])
    );
}

#[test]
fn delete_of_pending_edit_becomes_undo_and_delete() {
    let fixture = fixture();
    fixture.fs.remove("/ws/a.txt").unwrap();
    fixture.add_pending("a.txt", ChangeKinds::EDIT, None);

    assert_eq!(
        summary(&fixture.detect()),
        single("/ws/a.txt", &[OfflineChangeType::Undo, OfflineChangeType::Delete])
    );
}

#[test]
fn add_of_pending_delete_becomes_undo_and_edit() {
    let fixture = fixture();
    fixture.fs.create_file("/ws/c.txt", b"c").unwrap();
    fixture.add_pending("c.txt", ChangeKinds::DELETE, None);

    assert_eq!(
        summary(&fixture.detect()),
        single("/ws/c.txt", &[OfflineChangeType::Undo, OfflineChangeType::Edit])
    );
}

/// Pending rename of a.txt to renamed.txt, the local disk still has a.txt.
fn renamed_fixture() -> Fixture {
    let fixture = fixture();
    fixture.workspace.remove_item("$/proj/a.txt");
    fixture.workspace.add_file("$/proj/renamed.txt", b"a");
    fixture.add_pending("renamed.txt", ChangeKinds::RENAME, Some("$/proj/a.txt"));
    fixture
}

#[test]
fn removed_rename_target_with_retained_source_becomes_edit_of_source() {
    let fixture = renamed_fixture();

    let changes = fixture.detect();
    assert_eq!(
        summary(&changes),
        single(
            "/ws/renamed.txt",
            &[OfflineChangeType::Undo, OfflineChangeType::Edit]
        )
    );
    assert_eq!(changes[0].source_local_path(), Path::new("/ws/a.txt"));
}

#[test]
fn removed_rename_target_and_source_becomes_delete_of_source() {
    let fixture = renamed_fixture();
    fixture.fs.remove("/ws/a.txt").unwrap();

    let changes = fixture.detect();
    assert_eq!(
        summary(&changes),
        single(
            "/ws/renamed.txt",
            &[OfflineChangeType::Undo, OfflineChangeType::Delete]
        )
    );
    assert_eq!(changes[0].source_local_path(), Path::new("/ws/a.txt"));
}

#[test]
fn rename_from_unmapped_source_is_only_undone() {
    let fixture = fixture();
    fixture.workspace.add_file("$/proj/renamed.txt", b"x");
    fixture.add_pending("renamed.txt", ChangeKinds::RENAME, Some("$/other/x.txt"));

    let changes = fixture.detect();
    assert_eq!(
        summary(&changes),
        single("/ws/renamed.txt", &[OfflineChangeType::Undo])
    );
    assert_eq!(changes[0].source_local_path(), Path::new("/ws/renamed.txt"));
}

#[test]
fn canceled_runs_have_no_result() {
    let fixture = fixture();
    fixture.fs.create_file("/ws/new.txt", b"new").unwrap();
    let mut synchronizer = fixture.synchronizer();
    synchronizer.detect_changes(&NoProgress).unwrap();
    assert_eq!(synchronizer.changes().len(), 1);

    let token = CancellationToken::new();
    token.cancel();
    let error = synchronizer.detect_changes(&token).unwrap_err();
    assert!(error.is_canceled());
    assert!(synchronizer.changes().is_empty());
}

/// Cancels after a fixed number of polls, i.e. somewhere in the middle of a run.
struct CancelAfter(Cell<usize>);

impl TaskMonitor for CancelAfter {
    fn is_canceled(&self) -> bool {
        let remaining = self.0.get();
        if remaining == 0 {
            true
        } else {
            self.0.set(remaining - 1);
            false
        }
    }
}

#[test]
fn cancellation_is_polled_throughout_the_run() {
    let fixture = fixture();
    // Polls before the queries, per server item, per visited path and per hashed chunk.
    for poll_count in 0..14 {
        let mut synchronizer = fixture.synchronizer();
        match synchronizer.detect_changes(&CancelAfter(Cell::new(poll_count))) {
            Err(SynchronizerError::Canceled) => (),
            other => panic!("Must cancel after {} polls, got {:?}", poll_count, other),
        }
    }
}

#[test]
fn communication_failures_abort_the_run() {
    let fixture = fixture();
    fixture.workspace.set_unreachable(true);

    match fixture.synchronizer().detect_changes(&NoProgress) {
        Err(SynchronizerError::Workspace {
            source: WorkspaceError::Communication { .. },
        }) => (),
        other => panic!("Must report the communication failure, got {:?}", other),
    };
}

#[test]
fn unreadable_files_abort_the_run() {
    let fixture = fixture();
    fixture.fs.test_set_unreadable("/ws/sub/b.txt").unwrap();

    match fixture.synchronizer().detect_changes(&NoProgress) {
        Err(SynchronizerError::FSInteraction { source }) => {
            assert!(source.to_string().contains("b.txt"));
        }
        other => panic!("Must report the unreadable file, got {:?}", other),
    };
}

/// Answers every item query with no item sets at all.
struct EmptyAnswerWorkspace;

impl Workspace for EmptyAnswerWorkspace {
    fn service_level(&self) -> ServiceLevel {
        ServiceLevel::Tfs2012_2
    }
    fn query_items(
        &self,
        _: &[ItemSpec],
        _: VersionSpec,
        _: DeletedState,
    ) -> crate::workspace::Result<Vec<ItemSet>> {
        Ok(vec![])
    }
    fn query_items_with_properties(
        &self,
        _: &[ItemSpec],
        _: VersionSpec,
        _: DeletedState,
        _: &[&str],
    ) -> crate::workspace::Result<Vec<ItemSet>> {
        Ok(vec![])
    }
    fn pending_changes(&self) -> crate::workspace::Result<Vec<PendingChange>> {
        Ok(vec![])
    }
    fn local_to_server_path(&self, _: &Path) -> Option<String> {
        None
    }
    fn server_to_local_path(&self, _: &str) -> Option<PathBuf> {
        None
    }
    fn undo(&self, _: &[ItemSpec], _: PendOptions) -> crate::workspace::Result<usize> {
        Ok(0)
    }
    fn pend_add(&self, _: &[PathBuf], _: PendOptions) -> crate::workspace::Result<usize> {
        Ok(0)
    }
    fn pend_edit(&self, _: &[PathBuf], _: PendOptions) -> crate::workspace::Result<usize> {
        Ok(0)
    }
    fn pend_delete(&self, _: &[PathBuf], _: PendOptions) -> crate::workspace::Result<usize> {
        Ok(0)
    }
    fn pend_property_change(
        &self,
        _: &Path,
        _: &PropertyValue,
        _: PendOptions,
    ) -> crate::workspace::Result<usize> {
        Ok(0)
    }
}

#[test]
fn mismatched_item_sets_are_rejected() {
    let fs = InMemoryFS::new();
    fs.create_dir("/ws").unwrap();
    let workspace = EmptyAnswerWorkspace;

    let mut synchronizer =
        OfflineSynchronizer::with_fs(&workspace, PathListProvider::new(vec!["/ws"]), fs);
    match synchronizer.detect_changes(&NoProgress) {
        Err(SynchronizerError::Workspace {
            source: WorkspaceError::MismatchedResultCount { expected: 1, actual: 0 },
        }) => (),
        other => panic!("Must reject the answer, got {:?}", other),
    }
}

/// Resources are names, only some of them live on the local disk.
struct NamedProvider(Vec<(&'static str, Option<&'static str>)>);

impl OfflineSynchronizerProvider for NamedProvider {
    type Resource = &'static str;

    fn resources(&self) -> Vec<&'static str> {
        self.0.iter().map(|(name, _)| *name).collect()
    }

    fn local_path_for_resource(&self, resource: &&'static str) -> Option<PathBuf> {
        self.0
            .iter()
            .find(|(name, _)| name == resource)
            .and_then(|(_, path)| path.map(PathBuf::from))
    }
}

#[test]
fn resources_without_local_path_are_skipped() {
    let fixture = fixture();
    fixture.fs.create_file("/ws/sub/new.txt", b"new").unwrap();
    let provider = NamedProvider(vec![("remote-only", None), ("sub", Some("/ws/sub"))]);

    let mut synchronizer =
        OfflineSynchronizer::with_fs(&fixture.workspace, provider, fixture.fs.clone());
    assert_eq!(
        summary(&synchronizer.detect_changes(&NoProgress).unwrap()),
        single("/ws/sub/new.txt", &[OfflineChangeType::Add])
    );
    assert_eq!(synchronizer.provider().resources().len(), 2);
}
