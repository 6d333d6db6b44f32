use fabtrack::cache::{FileCache, LocalCache};
use fabtrack::catalog::{sample_catalog, task_id_for, Catalog, Task};
use fabtrack::fabric::builtin_fabrics;
use fabtrack::remote::FileRemote;
use fabtrack::store::Store;
use fabtrack::sync::{AppCommand, Synchronizer};

mod support;
use support::TestDir;

fn fresh_store() -> Store {
    Store::new(sample_catalog(), builtin_fabrics(), "north-it")
}

fn acc_task_id() -> String {
    task_id_for("Configure fabric access policies")
}

#[tokio::test]
async fn two_clients_share_state_through_the_directory() {
    let dir = TestDir::new();
    let share = dir.share_dir();
    let task_id = acc_task_id();

    // Client A checks a task and pushes.
    let mut a = Synchronizer::new(
        fresh_store(),
        FileCache::new(dir.path().join("a-cache.json")),
        FileRemote::new(&share),
    );
    a.start().await.unwrap();
    a.apply(AppCommand::SetTaskState {
        fabric_id: "north-it".into(),
        task_id: task_id.clone(),
        checked: true,
    })
    .await
    .unwrap();
    assert!(a.flush().await.unwrap());

    // Client B starts fresh and sees A's state.
    let mut b = Synchronizer::new(
        fresh_store(),
        FileCache::new(dir.path().join("b-cache.json")),
        FileRemote::new(&share),
    );
    b.start().await.unwrap();
    assert!(b.store().state().task_checked("north-it", &task_id));

    // B's cache was overwritten with the remote's data.
    let cached = FileCache::new(dir.path().join("b-cache.json"))
        .load()
        .unwrap()
        .unwrap();
    assert!(cached.fabric_states["north-it"][&task_id]);
}

#[tokio::test]
async fn offline_edits_survive_and_push_once_the_share_appears() {
    let dir = TestDir::new();
    // The share is not mounted yet.
    let share = dir.path().join("share-later");
    let cache_path = dir.path().join("cache.json");
    let task_id = acc_task_id();

    let mut sync = Synchronizer::new(
        fresh_store(),
        FileCache::new(cache_path.clone()),
        FileRemote::new(&share),
    );
    sync.start().await.unwrap();
    sync.apply(AppCommand::SetTaskState {
        fabric_id: "north-it".into(),
        task_id: task_id.clone(),
        checked: true,
    })
    .await
    .unwrap();
    assert!(sync.flush().await.is_err());

    // The mount appears; the retry pushes the cached edit.
    std::fs::create_dir_all(&share).unwrap();
    assert!(sync.flush().await.unwrap());
    assert!(share.join("snapshot.json").exists());

    // A later session with the same cache resumes from the same state.
    let mut restored = Synchronizer::new(
        fresh_store(),
        FileCache::new(cache_path),
        FileRemote::new(&share),
    );
    restored.start().await.unwrap();
    assert!(restored.store().state().task_checked("north-it", &task_id));
}

#[tokio::test]
async fn catalog_appends_land_in_the_shared_catalog() {
    let dir = TestDir::new();
    let share = dir.share_dir();
    // The shared catalog is provisioned up front.
    sample_catalog().save(&share.join("catalog.json")).unwrap();

    let mut sync = Synchronizer::new(
        fresh_store(),
        FileCache::new(dir.path().join("cache.json")),
        FileRemote::new(&share),
    );
    sync.start().await.unwrap();

    let text = "Validate multicast forwarding";
    sync.apply(AppCommand::AddTask {
        section_id: "section2".into(),
        subsection_title: "Fabric Configuration".into(),
        task: Task::new(text),
    })
    .await
    .unwrap();

    let shared = Catalog::load(&share.join("catalog.json")).unwrap();
    assert!(shared.find_task(&task_id_for(text)).is_some());
}
