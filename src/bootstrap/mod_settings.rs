//! Fallback mod-activation document
//!
//! Written only when the player has no saved `modSettings.json`; enables the
//! original game files plus the mods the engine needs to run them.

pub const DEFAULT_MOD_SETTINGS: &str = r#"{
    "activeMods" : {
        "extras" : {
            "active" : true
        },
        "vcmi" : {
            "active" : true,
            "checksum" : "abf49988",
            "validated" : true
        }
    },
    "core" : {
        "active" : true,
        "checksum" : "55b95539",
        "name" : "Original game files",
        "validated" : true
    }
}
"#;
