//! Restricts builds to Linux targets.

fn main() {
    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("linux") {
        println!("cargo:warning=cpu-glow reads /proc/stat and /dev/i2c-*, it can only be built for Linux!");
        std::process::exit(1);
    }
}
