use wbxml::Record;

#[derive(Debug, PartialEq, Record)]
struct CachedRecord {
    #[wbxml(tag = 0x45)]
    name: String,
    #[wbxml(tag = 0x46)]
    count: i32,
}

#[test]
fn test_schema_is_derived_once_per_type() {
    let first = CachedRecord::schema().expect("schema should derive");
    let second = CachedRecord::schema().expect("schema should derive");
    assert!(std::ptr::eq(first, second));
    assert_eq!(first.fields().len(), 2);
}

#[test]
fn test_concurrent_readers_observe_one_schema() {
    let handles: Vec<_> = (0..8)
        .map(|_| {
            std::thread::spawn(|| {
                CachedRecord::schema().expect("schema should derive") as *const _ as usize
            })
        })
        .collect();

    let pointers: Vec<usize> = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread panicked"))
        .collect();
    assert!(pointers.windows(2).all(|pair| pair[0] == pair[1]));
}
