// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

mod common;

use archive::{
    ArchiveError, Codec, DirectoryInterpreter, Extractor, FileMember, ReaderMaker, SealedCrypter,
    StoreMember, backup_members,
};
use bytes::Bytes;
use common::{
    CollectingInterpreter, FailingInterpreter, FlakyMember, MemoryMember, TruncatingMember,
    compress, sample_files, tar_bundle, tar_bundle_with_symlink,
};
use object_store::ObjectStore;
use object_store::memory::InMemory;
use remote::{BackupStorage, ENCRYPTION_KEY_LEN, ObjectStorage, StorageLayout};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tempfile::TempDir;

#[tokio::test]
async fn test_every_entry_delivered_once() {
    let mut members: Vec<Arc<dyn ReaderMaker>> = Vec::new();
    let mut expected = Vec::new();

    for (i, codec) in Codec::ALL.into_iter().enumerate() {
        let files = sample_files(codec.extension(), 4);
        let bundle = tar_bundle(&files).await;
        let path = format!("part_{}.tar.{}", i + 1, codec.extension());
        members.push(Arc::new(MemoryMember::new(path, compress(codec, &bundle).await)));
        expected.extend(files);
    }

    let raw_files = sample_files("raw", 3);
    members.push(Arc::new(MemoryMember::new(
        "part_6.tar",
        tar_bundle(&raw_files).await,
    )));
    expected.extend(raw_files);
    members.push(Arc::new(MemoryMember::new("part_7.tar.nop", b"ignored".to_vec())));

    let interpreter = Arc::new(CollectingInterpreter::default());
    Extractor::new(interpreter.clone())
        .extract_all(members)
        .await
        .unwrap();

    let counts = interpreter.delivery_counts();
    assert_eq!(counts.len(), expected.len());
    for (path, content) in &expected {
        assert_eq!(counts.get(path), Some(&1), "{path} delivered once");
        assert_eq!(interpreter.content(path).as_ref(), Some(content));
    }
}

#[tokio::test]
async fn test_encrypted_members() {
    let crypter = SealedCrypter::new(&[0x5a; ENCRYPTION_KEY_LEN]);
    let files = sample_files("sealed", 5);
    let bundle = tar_bundle(&files).await;
    let compressed = compress(Codec::Zstd, &bundle).await;

    let members: Vec<Arc<dyn ReaderMaker>> = vec![
        Arc::new(MemoryMember::new("part_1.tar.zst", crypter.seal(&compressed).unwrap())),
        Arc::new(MemoryMember::new("part_2.tar", crypter.seal(&tar_bundle(&sample_files("plain", 2)).await).unwrap())),
    ];

    let interpreter = Arc::new(CollectingInterpreter::default());
    Extractor::new(interpreter.clone())
        .with_crypter(Arc::new(crypter))
        .extract_all(members)
        .await
        .unwrap();

    assert_eq!(interpreter.delivery_counts().len(), 7);
    assert_eq!(interpreter.content("sealed/file_3"), Some(files[3].1.clone()));
}

#[tokio::test]
async fn test_no_members_error() {
    let interpreter = Arc::new(CollectingInterpreter::default());
    let err = Extractor::new(interpreter).extract_all(Vec::new()).await.unwrap_err();
    assert!(matches!(err, ArchiveError::NoMembers));
}

#[tokio::test]
async fn test_unsupported_extension_exhausts() {
    for path in ["part_1.tar.lzo", "part_1.tar.rar"] {
        let members: Vec<Arc<dyn ReaderMaker>> = vec![Arc::new(MemoryMember::new(path, Vec::new()))];
        let interpreter = Arc::new(CollectingInterpreter::default());
        let err = Extractor::new(interpreter)
            .extract_all(members)
            .await
            .unwrap_err();

        match err {
            ArchiveError::Exhausted { failed, ref source } => {
                assert_eq!(failed, 1);
                assert!(matches!(**source, ArchiveError::UnsupportedFileType { .. }));
            }
            ref other => panic!("unexpected error {other}"),
        }
        assert_eq!(err.member_path(), Some(path));
    }
}

#[tokio::test]
async fn test_flaky_member_recovers_on_retry() {
    let flaky = Arc::new(FlakyMember {
        inner: MemoryMember::new("part_2.tar", tar_bundle(&sample_files("flaky", 2)).await),
        failures: 1,
    });
    let members: Vec<Arc<dyn ReaderMaker>> = vec![
        Arc::new(MemoryMember::new("part_1.tar", tar_bundle(&sample_files("steady", 2)).await)),
        flaky.clone(),
        Arc::new(MemoryMember::new("part_3.tar", tar_bundle(&sample_files("other", 2)).await)),
    ];

    let interpreter = Arc::new(CollectingInterpreter::default());
    Extractor::new(interpreter.clone())
        .extract_all(members)
        .await
        .unwrap();

    assert_eq!(flaky.inner.opens.load(Ordering::SeqCst), 2);
    let counts = interpreter.delivery_counts();
    assert_eq!(counts.len(), 6);
    assert!(counts.values().all(|&n| n == 1));
}

#[tokio::test]
async fn test_permanent_failure_is_reported() {
    let broken = Arc::new(FlakyMember {
        inner: MemoryMember::new("part_9.tar", Vec::new()),
        failures: usize::MAX,
    });
    let members: Vec<Arc<dyn ReaderMaker>> = vec![
        Arc::new(MemoryMember::new("part_1.tar", tar_bundle(&sample_files("good", 1)).await)),
        broken.clone(),
    ];

    let interpreter = Arc::new(CollectingInterpreter::default());
    let err = Extractor::new(interpreter.clone())
        .extract_all(members)
        .await
        .unwrap_err();

    assert!(matches!(err, ArchiveError::Exhausted { failed: 1, .. }));
    assert_eq!(err.member_path(), Some("part_9.tar"));
    // concurrency 2, then 1 before giving up
    assert_eq!(broken.inner.opens.load(Ordering::SeqCst), 2);
    assert_eq!(interpreter.delivery_counts().get("good/file_0"), Some(&1));
}

#[tokio::test]
async fn test_corrupt_member_at_single_concurrency() {
    let members: Vec<Arc<dyn ReaderMaker>> = vec![
        Arc::new(MemoryMember::new("part_1.tar.gz", b"this is not gzip".to_vec())),
        Arc::new(MemoryMember::new("part_2.tar", tar_bundle(&sample_files("ok", 1)).await)),
    ];

    let interpreter = Arc::new(CollectingInterpreter::default());
    let err = Extractor::new(interpreter.clone())
        .with_max_concurrency(1)
        .extract_all(members)
        .await
        .unwrap_err();

    assert_eq!(err.member_path(), Some("part_1.tar.gz"));
    assert_eq!(interpreter.delivery_counts().get("ok/file_0"), Some(&1));
}

#[tokio::test]
async fn test_concurrency_bound() {
    let mut members: Vec<Arc<dyn ReaderMaker>> = Vec::new();
    for i in 0..6 {
        let files = sample_files(&format!("member_{i}"), 2);
        members.push(Arc::new(MemoryMember::new(
            format!("part_{i}.tar"),
            tar_bundle(&files).await,
        )));
    }

    let interpreter = Arc::new(CollectingInterpreter::with_delay(Duration::from_millis(20)));
    Extractor::new(interpreter.clone())
        .with_max_concurrency(2)
        .extract_all(members)
        .await
        .unwrap();

    let max = interpreter.max_in_flight.load(Ordering::SeqCst);
    assert!((1..=2).contains(&max), "max in flight was {max}");
    assert_eq!(interpreter.delivery_counts().len(), 12);
}

#[tokio::test]
async fn test_restore_from_store_into_directory() {
    let store = Arc::new(InMemory::new());
    let layout = StorageLayout::new("db1");
    let name = "base_000000010000000000000004";

    let first = vec![
        ("PG_VERSION".to_string(), b"17\n".to_vec()),
        ("base/1/1259".to_string(), vec![1u8; 9000]),
    ];
    let second = vec![("global/pg_control".to_string(), vec![2u8; 512])];
    store
        .put(
            &layout.partition(name, 1, "lz4"),
            Bytes::from(compress(Codec::Lz4, &tar_bundle(&first).await).await).into(),
        )
        .await
        .unwrap();
    store
        .put(
            &layout.partition(name, 2, "br"),
            Bytes::from(compress(Codec::Brotli, &tar_bundle(&second).await).await).into(),
        )
        .await
        .unwrap();
    store
        .put(&layout.sentinel(name), Bytes::from_static(b"{}").into())
        .await
        .unwrap();

    let storage: Arc<dyn BackupStorage> = Arc::new(ObjectStorage::new(store));
    let members = backup_members(storage, &layout, name).await.unwrap();
    assert_eq!(members.len(), 2);

    let dest = TempDir::new().unwrap();
    Extractor::new(Arc::new(DirectoryInterpreter::new(dest.path())))
        .extract_all(members)
        .await
        .unwrap();

    assert_eq!(std::fs::read(dest.path().join("PG_VERSION")).unwrap(), b"17\n");
    assert_eq!(std::fs::read(dest.path().join("base/1/1259")).unwrap(), vec![1u8; 9000]);
    assert_eq!(
        std::fs::read(dest.path().join("global/pg_control")).unwrap(),
        vec![2u8; 512]
    );
}

#[tokio::test]
async fn test_store_and_file_members_mix() {
    let store = Arc::new(InMemory::new());
    let key = object_store::path::Path::from("srv/basebackups/base_x/tar_partitions/part_1.tar.gz");
    store
        .put(
            &key,
            Bytes::from(compress(Codec::Gzip, &tar_bundle(&sample_files("store", 2)).await).await).into(),
        )
        .await
        .unwrap();

    let dir = TempDir::new().unwrap();
    let local = dir.path().join("part_2.tar.zst");
    std::fs::write(
        &local,
        compress(Codec::Zstd, &tar_bundle(&sample_files("local", 2)).await).await,
    )
    .unwrap();

    let members: Vec<Arc<dyn ReaderMaker>> = vec![
        Arc::new(StoreMember::new(Arc::new(ObjectStorage::new(store)), key)),
        Arc::new(FileMember::new(local)),
    ];
    let interpreter = Arc::new(CollectingInterpreter::default());
    Extractor::new(interpreter.clone())
        .extract_all(members)
        .await
        .unwrap();
    assert_eq!(interpreter.delivery_counts().len(), 4);
}

#[cfg(unix)]
#[tokio::test]
async fn test_retry_after_partial_restore_with_symlink() {
    let temp_dir = TempDir::new().unwrap();
    let data = vec![("base/1/1259".to_string(), vec![7u8; 4096])];
    let bundle = tar_bundle_with_symlink("pg_tblspc/16384", "/srv/tablespace", &data).await;

    // the reset lands inside the file data, after the link is on disk
    let broken = Arc::new(TruncatingMember {
        inner: MemoryMember::new("part_1.tar", bundle),
        failures: 1,
        cut: 1536,
    });
    let global = sample_files("global", 2);
    let healthy = Arc::new(MemoryMember::new("part_2.tar", tar_bundle(&global).await));
    let members: Vec<Arc<dyn ReaderMaker>> = vec![broken.clone(), healthy.clone()];

    Extractor::new(Arc::new(DirectoryInterpreter::new(temp_dir.path())))
        .extract_all(members)
        .await
        .unwrap();

    assert_eq!(broken.inner.opens.load(Ordering::SeqCst), 2);
    assert_eq!(healthy.opens.load(Ordering::SeqCst), 1);
    assert_eq!(
        std::fs::read_link(temp_dir.path().join("pg_tblspc/16384")).unwrap(),
        std::path::PathBuf::from("/srv/tablespace")
    );
    assert_eq!(
        std::fs::read(temp_dir.path().join("base/1/1259")).unwrap(),
        vec![7u8; 4096]
    );
    for (name, content) in &global {
        assert_eq!(&std::fs::read(temp_dir.path().join(name)).unwrap(), content);
    }
}

#[tokio::test]
async fn test_member_failing_on_both_sides_counted_once() {
    // large enough to fill the pipe, so the producer sees the consumer go away
    let bad_files = vec![("bad/relation".to_string(), vec![1u8; 1024 * 1024])];
    let bad = Arc::new(MemoryMember::new("part_1.tar", tar_bundle(&bad_files).await));
    let good = Arc::new(MemoryMember::new(
        "part_2.tar",
        tar_bundle(&sample_files("good", 3)).await,
    ));
    let members: Vec<Arc<dyn ReaderMaker>> = vec![bad.clone(), good.clone()];

    let interpreter = Arc::new(FailingInterpreter {
        prefix: "bad".to_string(),
    });
    let err = Extractor::new(interpreter)
        .extract_all(members)
        .await
        .unwrap_err();

    assert!(matches!(err, ArchiveError::Exhausted { failed: 1, .. }), "{err}");
    assert!(err.to_string().contains("part_1.tar"));
    assert_eq!(bad.opens.load(Ordering::SeqCst), 2);
    assert_eq!(good.opens.load(Ordering::SeqCst), 1);
}
