fn main() {
    // Writes $OUT_DIR/built.rs, surfaced through `fusion_gru_check::build_info`
    built::write_built_file().expect("Failed to generate build info");
}
