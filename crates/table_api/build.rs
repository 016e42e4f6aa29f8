use std::path::PathBuf;
use std::{env, fs};

fn main() {
	let crate_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
	let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

	println!("cargo:rerun-if-changed=src/lib.rs");

	let bindings = match cbindgen::Builder::new()
		.with_crate(&crate_dir)
		.with_language(cbindgen::Language::C)
		.with_include_guard("LOOKOUT_TABLE_API_H")
		.generate()
	{
		Ok(bindings) => bindings,
		Err(e) => {
			println!("cargo:warning=skipping table API header generation: {e}");
			return;
		}
	};

	let out_header = out_dir.join("lookout_table_api.h");
	bindings.write_to_file(&out_header);

	// Also emit to workspace target/generated for convenient access.
	if let Some(workspace_root) = crate_dir.parent().and_then(|p| p.parent()) {
		let gen_dir = workspace_root.join("target/generated");
		let _ = fs::create_dir_all(&gen_dir);
		let _ = fs::copy(&out_header, gen_dir.join("lookout_table_api.h"));
	}
}
