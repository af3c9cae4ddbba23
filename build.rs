use embed_manifest::{
    manifest::{ActiveCodePage, SupportedOS::{Windows10}, Setting},
    embed_manifest, new_manifest,
};

fn main() {
    if std::env::var_os("CARGO_CFG_WINDOWS").is_some() {
        // Console tool, no common controls or DPI settings needed
        let manifest = new_manifest("cpuident.exe.manifest")
            .remove_dependency("Microsoft.Windows.Common-Controls")
            .remove_max_version_tested()
            .active_code_page(ActiveCodePage::Utf8)
            .supported_os(Windows10..=Windows10) // Also includes Windows 11
            .long_path_aware(Setting::Enabled);

        if let Err(err) = embed_manifest(manifest) {
            panic!("unable to embed manifest file: {err}");
        }
    }
    println!("cargo:rerun-if-changed=build.rs");
}
