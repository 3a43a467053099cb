mod common;

use common::{ana, config, dead_endpoint, profile_service, StubEndpoint};
use jobfill_agent::source::ProfileSource;
use jobfill_agent::SourceError;
use jobfill_vault::{
    shared, InMemoryStore, JsonFileStore, Profile, ProfileField, ProfileStore, Provenance,
    ProvenanceSource, StoredProfile,
};

#[tokio::test]
async fn test_fetch_returns_profile() {
    let (service, url) = profile_service();
    let dir = tempfile::tempdir().unwrap();

    let source = ProfileSource::new(&config(&url, dir.path())).unwrap();
    assert_eq!(source.fetch_profile().await, Some(ana()));

    service.shutdown();
}

#[tokio::test]
async fn test_fetch_sends_user_id() {
    let (service, url) = profile_service();
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(&url, dir.path());
    config.user_id = Some("42".to_string());

    let profile = ProfileSource::new(&config).unwrap().fetch_profile().await.unwrap();
    assert_eq!(profile.get(ProfileField::Name), Some("Bea"));
    assert_eq!(profile.get(ProfileField::City), Some("Porto"));

    service.shutdown();
}

#[tokio::test]
async fn test_unknown_user_is_a_status_error() {
    let (service, url) = profile_service();
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(&url, dir.path());
    config.user_id = Some("nobody".to_string());

    let err = ProfileSource::new(&config).unwrap().try_fetch().await.unwrap_err();
    match err {
        SourceError::Status { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message.as_deref(), Some("user not found"));
        }
        other => panic!("unexpected error: {other}"),
    }

    service.shutdown();
}

#[tokio::test]
async fn test_server_error_yields_none_and_keeps_cache() {
    let stub = StubEndpoint::respond_with(500, "Internal Server Error");
    let dir = tempfile::tempdir().unwrap();
    let source = ProfileSource::new(&config(&stub.url, dir.path())).unwrap();

    let previous = StoredProfile {
        profile: Profile::new().with(ProfileField::Name, "Cached"),
        provenance: Provenance::imported(None),
    };
    let store = shared(InMemoryStore::with_profile(previous.clone()));

    assert_eq!(source.refresh(&store).await, None);
    assert_eq!(store.lock().unwrap().load().unwrap(), Some(previous));
}

#[tokio::test]
async fn test_invalid_json_yields_none_and_writes_nothing() {
    let stub = StubEndpoint::respond_with(200, "{ this is not json");
    let dir = tempfile::tempdir().unwrap();
    let config = config(&stub.url, dir.path());
    let source = ProfileSource::new(&config).unwrap();

    assert!(matches!(source.try_fetch().await, Err(SourceError::Parse(_))));

    let store = shared(JsonFileStore::new(&config.cache_path));
    assert_eq!(source.refresh(&store).await, None);
    assert!(!config.cache_path.exists());
}

#[tokio::test]
async fn test_error_body_is_a_service_error() {
    let stub = StubEndpoint::respond_with(200, r#"{"error": "database offline"}"#);
    let dir = tempfile::tempdir().unwrap();
    let source = ProfileSource::new(&config(&stub.url, dir.path())).unwrap();

    match source.try_fetch().await {
        Err(SourceError::Service(message)) => assert_eq!(message, "database offline"),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(source.fetch_profile().await, None);
}

#[tokio::test]
async fn test_unreachable_endpoint_is_a_transport_error() {
    let dir = tempfile::tempdir().unwrap();
    let source = ProfileSource::new(&config(&dead_endpoint(), dir.path())).unwrap();

    assert!(matches!(source.try_fetch().await, Err(SourceError::Transport(_))));
    assert_eq!(source.fetch_profile().await, None);
}

#[tokio::test]
async fn test_refresh_overwrites_file_cache() {
    let (service, url) = profile_service();
    let dir = tempfile::tempdir().unwrap();
    let config = config(&url, dir.path());

    let mut seeded = JsonFileStore::new(&config.cache_path);
    seeded
        .save(StoredProfile {
            profile: Profile::new()
                .with(ProfileField::Name, "Old")
                .with(ProfileField::Skills, "COBOL"),
            provenance: Provenance::imported(None),
        })
        .unwrap();

    let store = shared(JsonFileStore::new(&config.cache_path));
    let source = ProfileSource::new(&config).unwrap();
    assert_eq!(source.refresh(&store).await, Some(ana()));

    let cached = JsonFileStore::new(&config.cache_path).load().unwrap().unwrap();
    assert_eq!(cached.profile, ana());
    assert_eq!(cached.profile.get(ProfileField::Skills), None);
    assert_eq!(cached.provenance.source, ProvenanceSource::Fetched);
    assert_eq!(cached.provenance.origin.as_deref(), Some(url.as_str()));

    service.shutdown();
}
