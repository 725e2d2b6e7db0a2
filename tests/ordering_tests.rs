//! Dependency ordering tests
//!
//! Dependencies must be loaded before the modules that require them and unloaded
//! after them.

mod common;

use common::*;
use kmod_supervisor::LoadStatus;

// net -> (crypto, phy), phy -> (clk), crypto -> (clk)
const TREE: &str = r#"
[modules."net.ko".requires]
kernelModules = ["crypto.ko", "phy.ko"]

[modules."phy.ko"]
loadManual = true
[modules."phy.ko".requires]
kernelModules = ["clk.ko"]

[modules."crypto.ko"]
loadManual = true
[modules."crypto.ko".requires]
kernelModules = ["clk.ko"]

[modules."clk.ko"]
loadManual = true
"#;

#[test]
fn test_transitive_dependencies_load_first() {
    let mut m = manager(TREE);
    m.insert_all().unwrap();

    let launcher = m.launcher();
    assert_eq!(launcher.loads().len(), 4);

    let pos = |name| load_position(launcher, name).unwrap();
    assert!(pos("clk") < pos("crypto"));
    assert!(pos("clk") < pos("phy"));
    assert!(pos("crypto") < pos("net"));
    assert!(pos("phy") < pos("net"));
}

#[test]
fn test_install_order_is_reverse_discovery() {
    let mut m = manager(TREE);
    m.import_modules().unwrap();

    let sequence = m.resolve("net.ko").unwrap();
    assert_eq!(
        sequence.discovered(),
        ["net", "crypto", "clk", "phy", "clk"]
    );
    assert_eq!(
        sequence.install_order().collect::<Vec<_>>(),
        ["clk", "phy", "clk", "crypto", "net"]
    );
}

#[test]
fn test_shared_leaf_counted_per_path() {
    let mut m = manager(TREE);
    m.insert_all().unwrap();

    // reached through crypto and through phy
    assert_eq!(m.descriptor("clk").unwrap().use_count(), 2);
    assert_eq!(m.descriptor("net").unwrap().use_count(), 1);
}

#[test]
fn test_removal_unloads_dependents_first() {
    let mut m = manager(TREE);
    m.insert_all().unwrap();
    m.remove_all().unwrap();

    assert_eq!(m.launcher().unloads(), ["net", "crypto", "phy", "clk"]);
}

#[test]
fn test_removal_leaves_no_module_installed() {
    let mut m = manager(TREE);
    m.import_modules().unwrap();
    m.insert_list(["net"]).unwrap();

    for name in ["net", "crypto", "phy", "clk"] {
        assert_eq!(
            m.descriptor(name).unwrap().load_status(),
            LoadStatus::Installed
        );
    }

    // net is automatic, so only a full teardown removes it
    m.remove_list(["net"]).unwrap();
    assert!(m.launcher().unloads().is_empty());

    m.remove_all().unwrap();
    assert_eq!(m.launcher().unloads().len(), 4);
}
