//! Cheap metakernel probe.

const MARKER: &[u8] = b"KERNELS_TO_LOAD";

/// Whether `contents` mentions `KERNELS_TO_LOAD` anywhere.
///
/// Advisory only: the marker may sit inside a comment block. Text and bytes
/// are probed identically since a UTF-8 substring match is a byte match.
pub fn is_metakernel(contents: impl AsRef<[u8]>) -> bool {
    contents
        .as_ref()
        .windows(MARKER.len())
        .any(|window| window == MARKER)
}

#[cfg(test)]
mod tests {
    use super::is_metakernel;

    #[test]
    fn detects_marker_in_text_and_bytes() {
        assert!(is_metakernel("\\begindata\nKERNELS_TO_LOAD = ( 'a' )"));
        assert!(is_metakernel(b"\x00\xffKERNELS_TO_LOAD\x01".to_vec()));
        assert!(is_metakernel(String::from("KERNELS_TO_LOAD")));
    }

    #[test]
    fn rejects_blobs_without_marker() {
        assert!(!is_metakernel(""));
        assert!(!is_metakernel("KERNELS_TO_LOA"));
        assert!(!is_metakernel(&[0u8, 1, 2, 3][..]));
        assert!(!is_metakernel("kernels_to_load"));
    }
}
