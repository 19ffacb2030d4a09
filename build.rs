use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=src/ffi");
    println!("cargo:rerun-if-changed=cbindgen.toml");

    // Generate C header using cbindgen
    let Ok(crate_dir) = env::var("CARGO_MANIFEST_DIR") else {
        return;
    };
    let include_dir = PathBuf::from(&crate_dir).join("include");
    let output_path = include_dir.join("wrenvm.h");

    std::fs::create_dir_all(&include_dir).ok();

    let config = cbindgen::Config::from_file("cbindgen.toml")
        .unwrap_or_else(|_| cbindgen::Config::default());

    if let Err(e) = cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_config(config)
        .generate()
        .map(|bindings| bindings.write_to_file(&output_path))
    {
        eprintln!("Warning: Failed to generate C header: {}", e);
    }
}
