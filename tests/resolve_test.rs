//! Integration tests for board resolution
//!
//! Builds a packages root on disk, loads it through the package manager and
//! resolves fully qualified board names against the snapshot.

mod common;

use common::{TestEnv, AVR_BOARDS_TXT, AVR_PLATFORM_TXT};
use platman::core::fqbn::Fqbn;
use platman::core::manager::PackageManager;
use platman::error::{LoadError, ResolveError};
use platman::infra::host::detect_host_platform;

async fn load(env: &TestEnv) -> PackageManager {
    let manager = PackageManager::new(env.dirs.clone(), detect_host_platform());
    let warnings = manager.load_all(&[]).await.expect("Catalog should load");
    assert!(warnings.is_empty(), "Unexpected warnings: {warnings:?}");
    manager
}

fn fqbn(s: &str) -> Fqbn {
    Fqbn::parse(s).expect("valid fqbn")
}

fn arduino_avr(env: &TestEnv) {
    env.write_platform(
        "arduino",
        "avr",
        "1.8.6",
        &[("boards.txt", AVR_BOARDS_TXT), ("platform.txt", AVR_PLATFORM_TXT)],
    );
    env.write_tool("arduino", "avr-gcc", "7.3.0-atmel3.6.1-arduino7");
}

// ============================================
// Build properties
// ============================================

#[tokio::test]
async fn test_build_properties_contain_platform_board_and_runtime_keys() {
    let env = TestEnv::new();
    arduino_avr(&env);
    let manager = load(&env).await;
    let explorer = manager.new_explorer();

    let resolved = explorer.resolve_fqbn(&fqbn("arduino:avr:uno")).unwrap();
    let props = &resolved.build_properties;

    assert_eq!(resolved.board.name(), "Arduino Uno");
    // platform-only keys survive, board keys override platform ones
    assert_eq!(props.get("version"), Some("1.8.6"));
    assert_eq!(props.get("name"), Some("Arduino Uno"));
    assert_eq!(props.get("build.mcu"), Some("atmega328p"));
    assert_eq!(props.get("build.fqbn"), Some("arduino:avr:uno"));
    assert_eq!(props.get("build.arch"), Some("AVR"));
    assert_eq!(props.get("build.board"), Some("AVR_UNO"));

    let platform_dir = env.packages_dir().join("arduino/hardware/avr/1.8.6");
    assert_eq!(
        props.get("runtime.platform.path"),
        Some(platform_dir.to_string_lossy().as_ref())
    );
    assert_eq!(
        props.get("build.core.path"),
        Some(platform_dir.join("cores/arduino").to_string_lossy().as_ref())
    );

    let tool_dir = env
        .packages_dir()
        .join("arduino/tools/avr-gcc/7.3.0-atmel3.6.1-arduino7");
    assert_eq!(
        props.get("runtime.tools.avr-gcc.path"),
        Some(tool_dir.to_string_lossy().as_ref())
    );
    assert!(props
        .expand_props_in_string(props.get_or_empty("compiler.path"))
        .starts_with(tool_dir.to_string_lossy().as_ref()));
}

#[tokio::test]
async fn test_first_menu_value_is_the_default() {
    let env = TestEnv::new();
    arduino_avr(&env);
    let manager = load(&env).await;
    let explorer = manager.new_explorer();

    let default = explorer.resolve_fqbn(&fqbn("arduino:avr:nano")).unwrap();
    assert_eq!(default.build_properties.get("build.mcu"), Some("atmega328p"));

    let selected = explorer
        .resolve_fqbn(&fqbn("arduino:avr:nano:cpu=atmega168"))
        .unwrap();
    assert_eq!(selected.build_properties.get("build.mcu"), Some("atmega168"));
    assert_eq!(
        selected.build_properties.get("build.fqbn"),
        Some("arduino:avr:nano:cpu=atmega168")
    );
}

#[tokio::test]
async fn test_undeclared_option_fails() {
    let env = TestEnv::new();
    arduino_avr(&env);
    let manager = load(&env).await;
    let explorer = manager.new_explorer();

    match explorer
        .resolve_fqbn(&fqbn("arduino:avr:nano:speed=fast"))
        .unwrap_err()
    {
        ResolveError::InvalidOption { option, .. } => assert_eq!(option, "speed"),
        e => panic!("Expected InvalidOption error, got: {e:?}"),
    }
    match explorer
        .resolve_fqbn(&fqbn("arduino:avr:nano:cpu=atmega2560"))
        .unwrap_err()
    {
        ResolveError::InvalidOptionValue { value, .. } => assert_eq!(value, "atmega2560"),
        e => panic!("Expected InvalidOptionValue error, got: {e:?}"),
    }
}

#[tokio::test]
async fn test_normalize_drops_default_options() {
    let env = TestEnv::new();
    arduino_avr(&env);
    let manager = load(&env).await;
    let explorer = manager.new_explorer();

    let normalized = explorer
        .normalize_fqbn(&fqbn("arduino:avr:nano:cpu=atmega328"))
        .unwrap();
    assert_eq!(normalized.to_string(), "arduino:avr:nano");

    let kept = explorer
        .normalize_fqbn(&fqbn("arduino:avr:nano:cpu=atmega168"))
        .unwrap();
    assert_eq!(kept.to_string(), "arduino:avr:nano:cpu=atmega168");
}

// ============================================
// Reference platforms and overrides
// ============================================

#[tokio::test]
async fn test_referenced_core_comes_from_other_vendor() {
    let env = TestEnv::new();
    arduino_avr(&env);
    env.write_platform(
        "acme",
        "avr",
        "2.0.0",
        &[
            (
                "boards.txt",
                "rocket.name=Acme Rocket\nrocket.build.core=arduino:arduino\nrocket.build.mcu=atmega32u4\n",
            ),
            ("platform.txt", "name=Acme AVR\nversion=2.0.0\ncompiler.extra=-DACME\n"),
        ],
    );
    let manager = load(&env).await;
    let explorer = manager.new_explorer();

    let resolved = explorer.resolve_fqbn(&fqbn("acme:avr:rocket")).unwrap();
    let reference = resolved
        .reference_platform_release
        .expect("core is referenced");
    assert_eq!(reference.id().to_string(), "arduino:avr@1.8.6");

    let props = &resolved.build_properties;
    // board platform wins over the referenced one
    assert_eq!(props.get("version"), Some("2.0.0"));
    assert_eq!(props.get("name"), Some("Acme Rocket"));
    // referenced platform keys are still there
    assert!(props.contains_key("recipe.c.o.pattern"));
    assert_eq!(props.get("compiler.extra"), Some("-DACME"));
    assert_eq!(props.get("build.core"), Some("arduino"));
    assert_eq!(
        props.get("build.core.path"),
        Some(
            env.packages_dir()
                .join("arduino/hardware/avr/1.8.6/cores/arduino")
                .to_string_lossy()
                .as_ref()
        )
    );
}

#[tokio::test]
async fn test_missing_reference_platform_fails() {
    let env = TestEnv::new();
    env.write_platform(
        "acme",
        "avr",
        "2.0.0",
        &[
            ("boards.txt", "rocket.name=Acme Rocket\nrocket.build.core=arduino:arduino\n"),
            ("platform.txt", "name=Acme AVR\nversion=2.0.0\n"),
        ],
    );
    let manager = load(&env).await;
    let explorer = manager.new_explorer();

    match explorer.resolve_fqbn(&fqbn("acme:avr:rocket")).unwrap_err() {
        ResolveError::MissingReferencedPackage { package, .. } => assert_eq!(package, "arduino"),
        e => panic!("Expected MissingReferencedPackage error, got: {e:?}"),
    }
}

#[tokio::test]
async fn test_global_and_local_overrides_apply() {
    let env = TestEnv::new();
    arduino_avr(&env);
    env.write_platform(
        "arduino",
        "avr",
        "1.8.6",
        &[("boards.local.txt", "uno.build.mcu=atmega328pb\n")],
    );
    env.create_file(
        "data/packages/platform.txt",
        "compiler.path=/opt/avr/bin/\n",
    );
    let manager = load(&env).await;
    let explorer = manager.new_explorer();

    let resolved = explorer.resolve_fqbn(&fqbn("arduino:avr:uno")).unwrap();
    assert_eq!(resolved.build_properties.get("build.mcu"), Some("atmega328pb"));
    assert_eq!(
        resolved.build_properties.get("compiler.path"),
        Some("/opt/avr/bin/")
    );
}

// ============================================
// Loading
// ============================================

#[tokio::test]
async fn test_incomplete_install_is_ignored() {
    let env = TestEnv::new();
    arduino_avr(&env);
    env.write_platform(
        "arduino",
        "avr",
        "1.8.7",
        &[
            ("boards.txt", AVR_BOARDS_TXT),
            ("platform.txt", AVR_PLATFORM_TXT),
            (".platman-installing", ""),
        ],
    );

    let manager = PackageManager::new(env.dirs.clone(), detect_host_platform());
    let warnings = manager.load_all(&[]).await.unwrap();
    assert_eq!(warnings.len(), 1);
    assert!(matches!(warnings[0], LoadError::IncompleteInstall { .. }));

    let explorer = manager.new_explorer();
    let resolved = explorer.resolve_fqbn(&fqbn("arduino:avr:uno")).unwrap();
    assert_eq!(resolved.platform_release.version.to_string(), "1.8.6");
}

#[tokio::test]
async fn test_nothing_to_load_without_packages_or_indexes() {
    let env = TestEnv::new();
    let manager = PackageManager::new(env.dirs.clone(), detect_host_platform());

    match manager.load_all(&[]).await.unwrap_err() {
        LoadError::NothingToLoad { .. } => {}
        e => panic!("Expected NothingToLoad error, got: {e:?}"),
    }
}

#[tokio::test]
async fn test_boards_found_by_id_and_usb_id() {
    let env = TestEnv::new();
    arduino_avr(&env);
    let manager = load(&env).await;
    let explorer = manager.new_explorer();

    let boards: Vec<String> = explorer.installed_boards().iter().map(|b| b.fqbn()).collect();
    assert_eq!(boards, vec!["arduino:avr:uno", "arduino:avr:nano"]);

    let by_usb = explorer.find_boards_with_usb_id("0x2341", "0x0043");
    assert_eq!(by_usb.len(), 1);
    assert_eq!(by_usb[0].id, "uno");
    assert_eq!(explorer.find_boards_with_id("nano").len(), 1);
}
