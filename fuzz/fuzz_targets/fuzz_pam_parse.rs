#![no_main]

use libfuzzer_sys::fuzz_target;
use wicflif::PamImage;

// Arbitrary bytes must either parse into a consistent image or fail
// cleanly. A parsed image is re-serialized and parsed again; the two
// results must agree.
fuzz_target!(|data: &[u8]| {
    if data.len() > 1 << 20 {
        return;
    }
    let Ok(image) = PamImage::from_bytes(data) else {
        return;
    };
    let mut bytes = Vec::new();
    image.write_to(&mut bytes).unwrap();
    let reparsed = PamImage::from_bytes(&bytes).unwrap();
    assert_eq!(reparsed, image);
});
