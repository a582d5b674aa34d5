#![no_main]
use libfuzzer_sys::fuzz_target;
use refp::project::{MsbuildProject, ProjectModel};

fuzz_target!(|data: &str| {
    if let Ok(mut project) = MsbuildProject::parse(data) {
        let _ = project.add_import("global.props", Some("true"));
        if !project.references().is_empty() {
            let _ = project.set_metadata(0, "HintPath", "$(THIRD_PARTY_REFPATH)\\a.dll");
        }
    }
});
