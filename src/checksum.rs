/// Chaining CRC-32 (IEEE 802.3, reflected polynomial 0xEDB88320).
///
/// Passing the result of one call as `prior` to the next yields the same
/// value as a single call over the concatenated input, so a file can be
/// streamed through in chunks of any size.
pub fn crc32(buffer: &[u8], prior: u32) -> u32 {
    let mut hasher = crc32fast::Hasher::new_with_initial(prior);
    hasher.update(buffer);
    hasher.finalize()
}
