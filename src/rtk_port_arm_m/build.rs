use std::env;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    for cfg in ["armv6m", "armv8m_base", "has_fpu"] {
        println!("cargo:rustc-check-cfg=cfg({cfg})");
    }

    let target = env::var("TARGET").unwrap();

    // Hosted builds (e.g., `cargo test`) don't emit any of these; the crate
    // falls back to the Mainline frame layout in that case.
    if target.starts_with("thumbv6m-") {
        println!("cargo:rustc-cfg=armv6m");
    } else if target.starts_with("thumbv8m.base-") {
        println!("cargo:rustc-cfg=armv8m_base");
    }

    if target.starts_with("thumbv") && target.ends_with("eabihf") {
        println!("cargo:rustc-cfg=has_fpu");
    }
}
