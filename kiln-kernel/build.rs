use std::env;
use std::fs;
use toml::{Table, Value};

fn main() {
    let common_config = String::from("../build-config/common.toml");

    let arch = env::var("CARGO_CFG_TARGET_ARCH").unwrap();
    let kernel_config = format!("../build-config/{arch}/{arch}-kernel.toml");

    for config in [common_config, kernel_config] {
        println!("cargo::rerun-if-changed={}", config);

        let content = fs::read_to_string(&config).unwrap();
        let table: Table = toml::from_str(&content).unwrap();

        for (key, value) in table {
            let value = match value {
                Value::String(value) => value,
                value => value.to_string(),
            };
            println!("cargo::rustc-env={}={}", key, value);
        }
    }
}
