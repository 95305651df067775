use std::collections::HashMap;
use std::env;
use std::fmt::Write;
use std::path::PathBuf;

const PREFIX: &str = "DOT15D4_";

fn main() {
    // Name -> (type, default value)
    let mut settings: HashMap<&str, (&str, &str)> = HashMap::from([(
        "MAC_PAN_ID",
        ("PanId<[u8; 2]>", "PanId::new_owned([0xff, 0xff])"),
    )]);

    println!("cargo:rerun-if-changed=build.rs");
    for name in settings.keys() {
        println!("cargo:rerun-if-env-changed={PREFIX}{name}");
    }

    let mut config = String::from("use dot15d4_frame::PanId;\n\n");

    for (var, value) in env::vars() {
        let Some(name) = var.strip_prefix(PREFIX) else {
            continue;
        };
        let Some((name, (ty, _))) = settings.remove_entry(name) else {
            panic!("Unknown setting {var}");
        };
        writeln!(config, "pub const {name}: {ty} = {value};").unwrap();
    }

    // Settings not overridden by the environment.
    for (name, (ty, default)) in settings {
        writeln!(config, "pub const {name}: {ty} = {default};").unwrap();
    }

    let out_dir = PathBuf::from(env::var_os("OUT_DIR").unwrap());
    std::fs::write(out_dir.join("config.rs"), config).unwrap();
}
