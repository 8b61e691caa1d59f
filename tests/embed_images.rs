use std::fs;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tempfile::tempdir;

use notion_syndicate::embed::{check_image_tag, embed_image, EmbedError};

const FAKE_PNG: &[u8] = &[0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 1, 2, 3];

#[test]
fn line_without_image_markup_passes_through() {
    let dir = tempdir().unwrap();
    assert_eq!(check_image_tag("just some prose"), "");
    let out = embed_image("just some prose", dir.path()).unwrap();
    assert_eq!(out, "just some prose");
}

#[test]
fn tag_must_be_followed_by_space_or_end_of_line() {
    assert_eq!(check_image_tag("see ![alt](img.png) here"), "![alt](img.png)");
    assert_eq!(check_image_tag("ends with ![alt](img.png)"), "![alt](img.png)");
    assert_eq!(check_image_tag("glued![alt](img.png)suffix"), "");
}

#[test]
fn raster_image_is_inlined_uncompressed_with_the_gzip_label() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("img.png"), FAKE_PNG).unwrap();

    let out = embed_image("see ![alt](img.png) here", dir.path()).unwrap();

    // The label always says gzip, even though raster bytes are not
    // compressed; the payload must decode back to the raw file bytes.
    let payload = out
        .strip_prefix("see ![b64|gzip|.png](")
        .and_then(|rest| rest.strip_suffix(") here"))
        .expect("inlined tag should carry the pipe-delimited label");
    assert_eq!(BASE64.decode(payload).unwrap(), FAKE_PNG);
}

#[test]
fn dotted_svg_extension_never_hits_the_gzip_branch() {
    let dir = tempdir().unwrap();
    let svg = b"<svg xmlns='http://www.w3.org/2000/svg'/>";
    fs::write(dir.path().join("pic.svg"), svg).unwrap();

    let out = embed_image("![diagram](pic.svg)", dir.path()).unwrap();

    // Extension extraction keeps the leading dot, so the ".svg" vs "svg"
    // comparison fails and the payload stays uncompressed raw bytes.
    let payload = out
        .strip_prefix("![b64|gzip|.svg](")
        .and_then(|rest| rest.strip_suffix(')'))
        .expect("svg tag should keep its dotted extension in the label");
    assert_eq!(BASE64.decode(payload).unwrap(), svg.to_vec());
}

#[test]
fn percent_encoded_paths_are_decoded_before_reading() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("my image.png"), FAKE_PNG).unwrap();

    let out = embed_image("![a](my%20image.png) tail", dir.path()).unwrap();
    assert!(out.starts_with("![b64|gzip|.png]("));
    assert!(out.ends_with(" tail"));
}

#[test]
fn only_the_first_occurrence_is_replaced() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("img.png"), FAKE_PNG).unwrap();

    let line = "![a](img.png) and again ![a](img.png)";
    let out = embed_image(line, dir.path()).unwrap();
    assert!(out.starts_with("![b64|gzip|.png]("));
    assert!(out.ends_with("and again ![a](img.png)"));
}

#[test]
fn path_containing_the_split_token_is_truncated_at_it() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), FAKE_PNG).unwrap();

    // The path is cut at the next "](", so only "a" is read and the
    // dotless name leaves the extension label empty.
    let out = embed_image("![alt](a](b.png)", dir.path()).unwrap();
    assert!(out.starts_with("![b64|gzip|]("));
}

#[test]
fn missing_image_file_is_an_error() {
    let dir = tempdir().unwrap();
    let err = embed_image("![a](gone.png)", dir.path()).unwrap_err();
    assert!(matches!(err, EmbedError::Io { .. }));
}
