//! Integration tests for saving, loading and validating index files.

use fusion_index::index::{index_path_for, FileIndex, FileIndexBuilder, IndexEntry, LoadOptions};
use fusion_index::message::{MessageHeader, MessageType};
use fusion_index::{ConsistencyError, IndexError, NanHint};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Writes `len` filler bytes as a data file and returns its path.
fn write_data(dir: &Path, name: &str, len: usize) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, vec![0x5Au8; len]).unwrap();
    path
}

/// Writes framed messages with the given payload sizes; returns (path, offsets).
fn write_frames(dir: &Path, name: &str, payload_sizes: &[usize]) -> (PathBuf, Vec<u64>) {
    let path = dir.join(name);
    let mut data = Vec::new();
    let mut offsets = Vec::new();
    for (i, &size) in payload_sizes.iter().enumerate() {
        offsets.push(data.len() as u64);
        let mut header = MessageHeader::new(MessageType::POSE);
        header.sequence_number = i as u32;
        header.write_message(&mut data, &vec![i as u8; size]).unwrap();
    }
    fs::write(&path, data).unwrap();
    (path, offsets)
}

#[test]
fn test_end_to_end_build_save_reload() {
    let temp_dir = TempDir::new().unwrap();
    let data_path = write_data(temp_dir.path(), "drive.p1log", 52);
    let index_path = index_path_for(&data_path);

    let mut builder = FileIndexBuilder::new();
    builder.append(MessageType::new(5), 0, Some(10.0));
    builder.append(MessageType::new(5), 20, Some(10.5));
    builder.append(MessageType::new(99), 40, None);
    let built = builder.save(&index_path, Some(&data_path)).unwrap();
    assert_eq!(built.len(), 3);

    let options = LoadOptions::default().with_data_path(&data_path);
    let loaded = FileIndex::load(&index_path, &options).unwrap();
    assert_eq!(loaded.len(), 3);
    assert_eq!(loaded.t0(), Some(10.0));
    assert_eq!(loaded.offsets(), &[0, 20, 40]);
    assert_eq!(&loaded.times()[..2], &[10.0, 10.0]);
    assert!(loaded.times()[2].is_nan());

    let window = loaded
        .by_time_range(Some(10.0), Some(11.0), NanHint::RemoveNans)
        .unwrap();
    assert_eq!(window.offsets(), &[0, 20]);
}

#[test]
fn test_load_infers_data_path() {
    let temp_dir = TempDir::new().unwrap();
    let data_path = write_data(temp_dir.path(), "inferred.p1log", 30);
    let index_path = index_path_for(&data_path);

    FileIndex::from_entries(vec![IndexEntry::new(1.0, MessageType::POSE, 0)])
        .save(&index_path, Some(&data_path))
        .unwrap();

    // Data file grows; the inferred data file is validated against the marker.
    fs::write(&data_path, vec![0u8; 31]).unwrap();
    let err = FileIndex::load(&index_path, &LoadOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        IndexError::Consistency(ConsistencyError::SizeMismatch {
            actual: 31,
            expected: 30
        })
    ));
    assert!(!index_path.exists());
}

#[test]
fn test_load_without_data_file() {
    let temp_dir = TempDir::new().unwrap();
    let data_path = write_data(temp_dir.path(), "gone.p1log", 30);
    let index_path = index_path_for(&data_path);

    FileIndex::from_entries(vec![
        IndexEntry::new(1.0, MessageType::POSE, 0),
        IndexEntry::new(2.0, MessageType::POSE, 10),
    ])
    .save(&index_path, Some(&data_path))
    .unwrap();
    fs::remove_file(&data_path).unwrap();

    let loaded = FileIndex::load(&index_path, &LoadOptions::default()).unwrap();
    assert_eq!(loaded.len(), 2);

    let explicit = LoadOptions::default().with_data_path(&data_path);
    assert!(matches!(
        FileIndex::load(&index_path, &explicit),
        Err(IndexError::MissingFile { .. })
    ));
}

#[test]
fn test_missing_index_file() {
    let temp_dir = TempDir::new().unwrap();
    let result = FileIndex::load(&temp_dir.path().join("none.p1i"), &LoadOptions::default());
    assert!(matches!(result, Err(IndexError::MissingFile { .. })));
}

#[test]
fn test_truncated_index_file_is_format_error() {
    let temp_dir = TempDir::new().unwrap();
    let index_path = temp_dir.path().join("short.p1i");
    fs::write(&index_path, [0u8; 20]).unwrap();
    assert!(matches!(
        FileIndex::load(&index_path, &LoadOptions::default()),
        Err(IndexError::Format(_))
    ));
}

#[test]
fn test_empty_data_populated_index() {
    let temp_dir = TempDir::new().unwrap();
    let data_path = write_data(temp_dir.path(), "empty.p1log", 10);
    let index_path = index_path_for(&data_path);
    FileIndex::from_entries(vec![IndexEntry::new(1.0, MessageType::POSE, 0)])
        .save(&index_path, Some(&data_path))
        .unwrap();
    fs::write(&data_path, b"").unwrap();

    let keep = LoadOptions::default()
        .with_data_path(&data_path)
        .with_delete_on_error(false);
    let err = FileIndex::load(&index_path, &keep).unwrap_err();
    assert!(err.is_consistency());
    assert!(index_path.exists());

    let delete = LoadOptions::default().with_data_path(&data_path);
    let err = FileIndex::load(&index_path, &delete).unwrap_err();
    assert!(matches!(
        err,
        IndexError::Consistency(ConsistencyError::EmptyMismatch { data_size: 0, .. })
    ));
    assert!(!index_path.exists());
}

#[test]
fn test_empty_index_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let data_path = write_data(temp_dir.path(), "blank.p1log", 0);
    let index_path = index_path_for(&data_path);

    FileIndex::new().save(&index_path, Some(&data_path)).unwrap();
    assert_eq!(fs::metadata(&index_path).unwrap().len(), 0);

    let loaded = FileIndex::load(&index_path, &LoadOptions::default()).unwrap();
    assert!(loaded.is_empty());
    assert_eq!(loaded.t0(), None);
}

#[test]
fn test_size_mismatch_without_marker() {
    let temp_dir = TempDir::new().unwrap();
    let (data_path, offsets) = write_frames(temp_dir.path(), "frames.p1log", &[16, 8, 32]);
    let index_path = index_path_for(&data_path);

    let entries: Vec<IndexEntry> = offsets
        .iter()
        .enumerate()
        .map(|(i, &off)| IndexEntry::new(i as f64, MessageType::POSE, off))
        .collect();
    let index = FileIndex::from_entries(entries);

    // Saved without a data path: no marker, so the last header decides.
    index.save(&index_path, None).unwrap();
    let options = LoadOptions::default()
        .with_data_path(&data_path)
        .with_delete_on_error(false);
    assert_eq!(FileIndex::load(&index_path, &options).unwrap().len(), 3);

    // Drop the last entry: the data file now extends past the indexed messages.
    index
        .by_range(..2)
        .unwrap()
        .save(&index_path, None)
        .unwrap();
    let err = FileIndex::load(&index_path, &options).unwrap_err();
    let expected = offsets[2];
    let actual = fs::metadata(&data_path).unwrap().len();
    match err {
        IndexError::Consistency(ConsistencyError::SizeMismatch {
            actual: a,
            expected: e,
        }) => {
            assert_eq!(a, actual);
            assert_eq!(e, expected);
            let message = IndexError::from(ConsistencyError::SizeMismatch {
                actual: a,
                expected: e,
            })
            .to_string();
            assert!(message.contains(&actual.to_string()));
            assert!(message.contains(&expected.to_string()));
        }
        other => panic!("Expected size mismatch, got {:?}", other),
    }
}

#[test]
fn test_save_overwrites_existing_index() {
    let temp_dir = TempDir::new().unwrap();
    let data_path = write_data(temp_dir.path(), "over.p1log", 100);
    let index_path = index_path_for(&data_path);

    let large: FileIndex = (0..10)
        .map(|i| IndexEntry::new(i as f64, MessageType::POSE, i * 10))
        .collect();
    large.save(&index_path, Some(&data_path)).unwrap();

    let small = large.by_range(..3).unwrap();
    small.save(&index_path, Some(&data_path)).unwrap();

    let loaded = FileIndex::load(&index_path, &LoadOptions::default()).unwrap();
    assert_eq!(loaded.offsets(), &[0, 10, 20]);
}
