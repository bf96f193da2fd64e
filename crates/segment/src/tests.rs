use super::*;
use ::block::BlockBuilder;
use tempfile::tempdir;

// -------------------- Segment file I/O --------------------

#[test]
fn append_then_read_range_round_trips() {
    let dir = tempdir().unwrap();
    let seg = Segment::open(dir.path(), 1).unwrap();
    let (start, end) = seg.append(b"hello world").unwrap();
    assert_eq!((start, end), (0, 11));
    let back = seg.read_range(0, 11).unwrap();
    assert_eq!(back, b"hello world");
}

#[test]
fn read_range_with_negative_end_reads_to_eof() {
    let dir = tempdir().unwrap();
    let seg = Segment::open(dir.path(), 1).unwrap();
    seg.append(b"abc").unwrap();
    seg.append(b"def").unwrap();
    let all = seg.read_range(0, -1).unwrap();
    assert_eq!(all, b"abcdef");
    let tail = seg.read_range(3, -1).unwrap();
    assert_eq!(tail, b"def");
}

#[test]
fn tell_eof_tracks_file_size() {
    let dir = tempdir().unwrap();
    let seg = Segment::open(dir.path(), 7).unwrap();
    assert_eq!(seg.tell_eof().unwrap(), 0);
    seg.append(b"12345").unwrap();
    assert_eq!(seg.tell_eof().unwrap(), 5);
}

#[test]
fn reopening_an_existing_segment_preserves_contents() {
    let dir = tempdir().unwrap();
    {
        let seg = Segment::open(dir.path(), 3).unwrap();
        seg.append(b"persisted").unwrap();
    }
    let seg = Segment::open(dir.path(), 3).unwrap();
    assert_eq!(seg.read_range(0, -1).unwrap(), b"persisted");
}

// -------------------- Naming / discovery --------------------

#[test]
fn segment_path_uses_dotted_id_suffix() {
    let dir = tempdir().unwrap();
    let p = segment_path(dir.path(), 42);
    assert_eq!(p.file_name().unwrap().to_str().unwrap(), "segment.42");
}

#[test]
fn list_segment_ids_returns_sorted_ascending() {
    let dir = tempdir().unwrap();
    for id in [5u64, 1, 3] {
        Segment::open(dir.path(), id).unwrap();
    }
    assert_eq!(list_segment_ids(dir.path()).unwrap(), vec![1, 3, 5]);
}

#[test]
fn list_stray_compact_segments_finds_leftover_staging_files() {
    let dir = tempdir().unwrap();
    Segment::open(dir.path(), 1).unwrap();
    std::fs::write(compact_segment_path(dir.path(), 9), b"partial").unwrap();
    let stray = list_stray_compact_segments(dir.path()).unwrap();
    assert_eq!(stray.len(), 1);
    assert_eq!(
        stray[0].file_name().unwrap().to_str().unwrap(),
        "_compact_segment.9"
    );
}

// -------------------- Block iteration --------------------

#[test]
fn iterate_blocks_yields_each_block_with_its_offset() {
    let dir = tempdir().unwrap();
    let seg = Segment::open(dir.path(), 1).unwrap();

    let mut b1 = BlockBuilder::new();
    b1.add(b"a", b"1").unwrap();
    let f1 = b1.dump(false).unwrap();
    let (off1, _) = seg.append(&f1).unwrap();

    let mut b2 = BlockBuilder::new();
    b2.add(b"b", b"2").unwrap();
    let f2 = b2.dump(false).unwrap();
    let (off2, _) = seg.append(&f2).unwrap();

    let (blocks, trailing) = seg.iterate_blocks().unwrap();
    assert_eq!(trailing, 0);
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].offset, off1);
    assert_eq!(blocks[1].offset, off2);
    assert_eq!(::block::decode(&blocks[0].bytes, true).unwrap()[0].0, b"a");
    assert_eq!(::block::decode(&blocks[1].bytes, true).unwrap()[0].0, b"b");
}

#[test]
fn iterate_blocks_reports_truncated_tail_bytes() {
    let dir = tempdir().unwrap();
    let seg = Segment::open(dir.path(), 1).unwrap();

    let mut b = BlockBuilder::new();
    b.add(b"a", b"1").unwrap();
    let framed = b.dump(false).unwrap();
    seg.append(&framed[..framed.len() - 1]).unwrap();

    let (blocks, trailing) = seg.iterate_blocks().unwrap();
    assert!(blocks.is_empty());
    assert_eq!(trailing, framed.len() - 1);
}

#[test]
fn iterate_blocks_on_empty_segment_is_empty() {
    let dir = tempdir().unwrap();
    let seg = Segment::open(dir.path(), 1).unwrap();
    let (blocks, trailing) = seg.iterate_blocks().unwrap();
    assert!(blocks.is_empty());
    assert_eq!(trailing, 0);
}

// -------------------- Sparse index --------------------

#[test]
fn find_returns_none_below_first_key_guard() {
    let mut idx = SparseIndex::new();
    idx.push(b"m".to_vec(), (0, 10));
    idx.push(b"z".to_vec(), (10, 20));
    assert_eq!(idx.find(b"a"), None);
}

#[test]
fn find_returns_exact_match_range() {
    let mut idx = SparseIndex::new();
    idx.push(b"a".to_vec(), (0, 10));
    idx.push(b"m".to_vec(), (10, 20));
    assert_eq!(idx.find(b"m"), Some((10, 20)));
}

#[test]
fn find_returns_containing_block_for_key_between_anchors() {
    let mut idx = SparseIndex::new();
    idx.push(b"a".to_vec(), (0, 10));
    idx.push(b"m".to_vec(), (10, 20));
    idx.push(b"z".to_vec(), (20, 30));
    assert_eq!(idx.find(b"q"), Some((10, 20)));
}

#[test]
fn find_on_empty_index_returns_none() {
    let idx = SparseIndex::new();
    assert_eq!(idx.find(b"anything"), None);
}

#[test]
fn sort_orders_out_of_order_pushes() {
    let mut idx = SparseIndex::new();
    idx.push(b"z".to_vec(), (20, 30));
    idx.push(b"a".to_vec(), (0, 10));
    idx.sort();
    assert_eq!(idx.find(b"b"), Some((0, 10)));
}
