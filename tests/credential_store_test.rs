use psvue_client_lib::credentials::{CredentialStore, CredentialUpdate, Credentials};

fn store() -> (tempfile::TempDir, CredentialStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = CredentialStore::new(dir.path());
    (dir, store)
}

#[test]
fn test_first_load_bootstraps_a_device_record() {
    let (_dir, store) = store();

    let creds = store.load().unwrap();
    assert!(!creds.device_id.is_empty(), "device id should be generated");
    assert!(creds.code.is_none(), "fresh record has no grant code");
    assert!(
        !creds.is_valid_at(chrono::Utc::now()),
        "fresh record must force a login"
    );

    // The bootstrap record must have hit disk: a second load keeps the
    // same device id instead of minting a new one.
    let again = store.load().unwrap();
    assert_eq!(again.device_id, creds.device_id);
}

#[test]
fn test_partial_save_keeps_unmentioned_fields() {
    let (_dir, store) = store();
    let original = store.load().unwrap();

    let merged = store
        .save(CredentialUpdate {
            code: Some("grant-123".to_string()),
            ..Default::default()
        })
        .unwrap();

    assert_eq!(merged.device_id, original.device_id);
    assert_eq!(merged.code.as_deref(), Some("grant-123"));
    assert_eq!(merged.expiry_date, original.expiry_date);

    // A later expiry-only save must not wipe the grant code.
    let merged = store
        .save(CredentialUpdate {
            expiry_date: Some("2099-01-01T00:00:00Z".to_string()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(merged.code.as_deref(), Some("grant-123"));
    assert!(merged.is_valid_at(chrono::Utc::now()));
}

#[test]
fn test_reset_mints_a_new_device() {
    let (_dir, store) = store();
    let first = store.load().unwrap();
    store
        .save(CredentialUpdate {
            code: Some("grant-123".to_string()),
            ..Default::default()
        })
        .unwrap();

    let fresh = store.reset().unwrap();
    assert_ne!(fresh.device_id, first.device_id);
    assert!(fresh.code.is_none());
    assert_eq!(store.load().unwrap().device_id, fresh.device_id);
}

#[test]
fn test_unparseable_expiry_counts_as_expired() {
    let creds = Credentials {
        expiry_date: "not a date".to_string(),
        ..Credentials::bootstrap()
    };
    assert!(!creds.is_valid_at(chrono::Utc::now()));
}
