use log::info;

const BYTES_PER_LINE: usize = 16;

/// Dump a buffer to the diagnostic sink, 16 bytes per row.
pub(crate) fn log_hex(label: &str, buf: &[u8]) {
    info!("{} ({} bytes):", label, buf.len());
    for (row, chunk) in buf.chunks(BYTES_PER_LINE).enumerate() {
        info!("  {:04X}: {:02X?}", row * BYTES_PER_LINE, chunk);
    }
}
