use figment::Jail;
use lig_config::LigConfig;

#[test]
fn env_vars_override_defaults() {
    Jail::expect_with(|jail| {
        jail.set_env("LIGATURE_ENGINE__CID_PREFIX", "env");
        jail.set_env("LIGATURE_LOG__FILTER", "trace");

        let config = LigConfig::load().expect("config loads");
        assert_eq!(config.engine.cid_prefix, "env");
        assert_eq!(config.log.filter, "trace");
        Ok(())
    });
}

#[test]
fn env_vars_beat_project_file() {
    Jail::expect_with(|jail| {
        jail.create_dir(".ligature")?;
        jail.create_file(
            ".ligature/config.toml",
            "[engine]\nstrict_nested = true\n",
        )?;
        jail.set_env("LIGATURE_ENGINE__STRICT_NESTED", "false");

        let config = LigConfig::load().expect("config loads");
        assert!(!config.engine.strict_nested);
        Ok(())
    });
}
