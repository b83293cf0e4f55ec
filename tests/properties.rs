use pixjoin::container::{self, JoinOptions};
use pixjoin::pixel::PixelCodec;
use pixjoin::{DecodeError, FormatVersion, Item, PngSurface, TextScheme};
use proptest::prelude::*;
use serde_json::{Map, Value};

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        any::<String>().prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map(any::<String>(), inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

fn arb_item() -> impl Strategy<Value = Item> {
    let name = "[a-z0-9._-]{1,12}|\\PC{1,6}";
    let bytes = prop::collection::vec(any::<u8>(), 0..64);
    prop_oneof![
        (name, ".{0,12}", bytes.clone()).prop_map(|(n, mime, b)| Item::file(n, mime, b)),
        (name, proptest::option::of("[a-z/]{0,10}"), bytes)
            .prop_map(|(name, mime_type, bytes)| Item::Blob { name, mime_type, bytes }),
        (name, any::<String>()).prop_map(|(n, s)| Item::string(n, s)),
        (name, arb_json()).prop_map(|(n, v)| Item::json(n, v)),
    ]
}

fn arb_version() -> impl Strategy<Value = FormatVersion> {
    prop_oneof![
        Just(FormatVersion::LegacyArray),
        Just(FormatVersion::Unversioned),
        Just(FormatVersion::current()),
    ]
}

proptest! {
    #[test]
    fn text_schemes_roundtrip(s in any::<String>()) {
        for scheme in [TextScheme::Compact, TextScheme::Legacy] {
            prop_assert_eq!(scheme.decode(&scheme.encode(&s)).unwrap(), s.clone());
        }
    }

    #[test]
    fn container_roundtrip(
        items in prop::collection::vec(arb_item(), 0..8),
        version in arb_version(),
    ) {
        let opts = JoinOptions { version, ..JoinOptions::default() };
        let buf = container::join_with(&items, &opts).unwrap();
        prop_assert_eq!(container::split(&buf, None).unwrap(), items);
    }

    #[test]
    fn name_filter_keeps_matching_items_in_order(
        items in prop::collection::vec(arb_item(), 1..8),
        pick in any::<prop::sample::Index>(),
    ) {
        let buf = container::join(&items, None).unwrap().bytes;
        let wanted = items[pick.index(items.len())].name().to_owned();
        let expected: Vec<Item> = items.iter().filter(|i| i.name() == wanted).cloned().collect();
        prop_assert_eq!(container::split(&buf, Some(&[wanted.as_str()])).unwrap(), expected);
    }

    #[test]
    fn truncated_payload_is_rejected(
        items in prop::collection::vec(arb_item(), 1..6),
        cut in 1usize..64,
    ) {
        let buf = container::join(&items, None).unwrap().bytes;
        let payload = container::parse_metadata(&buf).unwrap().payload_len() as usize;
        prop_assume!(payload > 0);
        let cut = cut.min(payload);
        let is_truncated = matches!(
            container::split(&buf[..buf.len() - cut], None),
            Err(DecodeError::TruncatedArchive { .. })
        );
        prop_assert!(is_truncated);
    }

    #[test]
    fn pixel_frame_roundtrip(
        payload in prop::collection::vec(any::<u8>(), 0..2048),
        filename in any::<String>(),
    ) {
        let frame = PixelCodec::default().pack(&payload, &filename).unwrap();
        prop_assert_eq!(frame.width, frame.height);
        let back = PixelCodec::unpack(&frame).unwrap();
        prop_assert_eq!(back.filename, filename);
        prop_assert_eq!(back.bytes, payload);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn png_roundtrip(
        payload in prop::collection::vec(any::<u8>(), 0..4096),
        filename in "\\PC{0,16}",
    ) {
        let codec = PixelCodec::default();
        let mut surface = PngSurface::new();
        let png = codec.encode(&mut surface, &payload, &filename).unwrap();
        let back = codec.decode(&mut surface, &png).unwrap();
        prop_assert_eq!(back.filename, filename);
        prop_assert_eq!(back.bytes, payload);
    }
}
