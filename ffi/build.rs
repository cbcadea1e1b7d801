use std::path::PathBuf;

/// Generate `include/feedback_kit.h` for iOS/Android hosts.
fn main() {
    println!("cargo:rerun-if-changed=src");
    let Ok(crate_dir) = std::env::var("CARGO_MANIFEST_DIR") else {
        return;
    };
    let out_dir = PathBuf::from(&crate_dir).join("include");
    if let Err(e) = std::fs::create_dir_all(&out_dir) {
        println!("cargo:warning=could not create {}: {e}", out_dir.display());
        return;
    }

    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("FEEDBACK_KIT_H")
        .generate()
    {
        Ok(bindings) => {
            bindings.write_to_file(out_dir.join("feedback_kit.h"));
        }
        Err(e) => println!("cargo:warning=cbindgen failed: {e}"),
    }
}
