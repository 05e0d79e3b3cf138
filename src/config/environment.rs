use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};

use crate::env::{expand_placeholders, load_env_file_sync, EnvMap};

use super::{ApiConfig, HarnessConfig, LoadedConfig, ProxyConfig};

fn resolve_relative(base: &Path, value: &Path) -> PathBuf {
    if value.is_absolute() {
        value.to_path_buf()
    } else {
        base.join(value)
    }
}

/// A fully resolved profile, ready to hand to a
/// [`RequestExecutor`](crate::executor::RequestExecutor).
#[derive(Debug, Clone)]
pub struct HarnessEnvironment {
    pub profile_name: Option<String>,
    pub api: ApiConfig,
    pub variables: EnvMap,
    pub env_files: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct EnvironmentBuilder {
    base_dir: PathBuf,
    config: Option<LoadedConfig>,
    requested_profile: Option<String>,
    explicit_env: Option<PathBuf>,
    explicit_output_dir: Option<PathBuf>,
}

impl EnvironmentBuilder {
    pub fn new(base_dir: PathBuf, config: Option<LoadedConfig>) -> Self {
        Self {
            base_dir,
            config,
            requested_profile: None,
            explicit_env: None,
            explicit_output_dir: None,
        }
    }

    pub fn profile(mut self, name: Option<String>) -> Self {
        self.requested_profile = name;
        self
    }

    pub fn env_file(mut self, path: Option<PathBuf>) -> Self {
        self.explicit_env = path;
        self
    }

    pub fn output_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.explicit_output_dir = dir;
        self
    }

    pub fn build(&self) -> Result<HarnessEnvironment> {
        let mut variables: EnvMap = HashMap::new();
        let mut env_files = Vec::new();

        let Some(loaded) = &self.config else {
            if let Some(explicit) = &self.explicit_env {
                env_files.push(load_env_file_sync(explicit, &mut variables)?);
            }
            let api = ApiConfig {
                response_output_dir: self
                    .explicit_output_dir
                    .as_deref()
                    .map(|dir| resolve_relative(&self.base_dir, dir)),
                ..ApiConfig::default()
            };
            return Ok(HarnessEnvironment {
                profile_name: None,
                api,
                variables,
                env_files,
            });
        };

        let profile = resolve_profile(&loaded.config, self.requested_profile.as_deref())?;
        variables.extend(loaded.config.variables.clone());

        let env_path = self
            .explicit_env
            .clone()
            .or_else(|| loaded.config.env.as_ref().map(|env| loaded.dir.join(env)));
        if let Some(env_path) = env_path {
            env_files.push(load_env_file_sync(&env_path, &mut variables)?);
        }

        let mut api = expand_api_config(profile.config, &variables)
            .with_context(|| format!("expanding profile {}", profile.name))?;

        api.response_output_dir = match &self.explicit_output_dir {
            Some(dir) => Some(resolve_relative(&self.base_dir, dir)),
            None => api
                .response_output_dir
                .as_deref()
                .or(loaded.config.response_output_dir.as_deref().map(Path::new))
                .map(|dir| resolve_relative(&loaded.dir, dir)),
        };

        Ok(HarnessEnvironment {
            profile_name: Some(profile.name),
            api,
            variables,
            env_files,
        })
    }
}

struct ResolvedProfile<'a> {
    name: String,
    config: &'a ApiConfig,
}

fn resolve_profile<'a>(
    config: &'a HarnessConfig,
    requested: Option<&str>,
) -> Result<ResolvedProfile<'a>> {
    if config.profiles.is_empty() {
        bail!("No profiles defined in configuration");
    }

    if let Some(name) = requested {
        if let Some(profile) = config.profiles.get(name) {
            return Ok(ResolvedProfile {
                name: name.to_string(),
                config: profile,
            });
        }
        bail!("Unknown profile: {}", name);
    }

    if let Some(default) = &config.default_profile {
        if let Some(profile) = config.profiles.get(default) {
            return Ok(ResolvedProfile {
                name: default.to_string(),
                config: profile,
            });
        }
    }

    if let Some((name, profile)) = config.profiles.iter().next() {
        return Ok(ResolvedProfile {
            name: name.to_string(),
            config: profile,
        });
    }

    bail!("No profile candidates available");
}

fn expand_opt(value: &Option<String>, env: &EnvMap) -> Result<Option<String>> {
    value
        .as_deref()
        .map(|raw| expand_placeholders(raw, env))
        .transpose()
}

fn expand_api_config(config: &ApiConfig, env: &EnvMap) -> Result<ApiConfig> {
    let headers = config
        .headers
        .iter()
        .map(|(name, value)| -> Result<(String, String)> {
            Ok((name.clone(), expand_placeholders(value, env)?))
        })
        .collect::<Result<_>>()?;

    let cookies = config
        .cookies
        .as_ref()
        .map(|cookies| {
            cookies
                .iter()
                .map(|cookie| expand_placeholders(cookie, env))
                .collect::<Result<Vec<_>>>()
        })
        .transpose()?;

    let proxy = match &config.proxy {
        Some(proxy) => {
            let mut expanded = ProxyConfig {
                host: expand_placeholders(&proxy.host, env)?,
                ..proxy.clone()
            };
            if let Some(auth) = &mut expanded.auth {
                auth.username = expand_placeholders(&auth.username, env)?;
                auth.password = expand_placeholders(&auth.password, env)?;
            }
            Some(expanded)
        }
        None => None,
    };

    Ok(ApiConfig {
        base_url: expand_placeholders(&config.base_url, env)?,
        auth: expand_opt(&config.auth, env)?,
        headers,
        cookies,
        proxy,
        response_type: expand_opt(&config.response_type, env)?,
        accept: expand_opt(&config.accept, env)?,
        cache_control: expand_opt(&config.cache_control, env)?,
        connection: expand_opt(&config.connection, env)?,
        ..config.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{load_config, AuthType};
    use anyhow::Result;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn write_file(path: &Path, contents: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    const CONFIG: &str = r#"{
  "variables": {"HOST": "https://api.tvmaze.com"},
  "env": "default.env",
  "defaultProfile": "basic",
  "responseOutputDir": "root-responses",
  "profiles": {
    "basic": {
      "baseUrl": "{HOST}",
      "authType": "basic",
      "auth": "{TOKEN}"
    },
    "staging": {
      "baseUrl": "{HOST}/staging",
      "authType": "x-api-key",
      "auth": "{TOKEN}",
      "cookies": ["session={SESSION}"],
      "headers": {"X-Trace": "\\{raw\\}"},
      "responseOutputDir": "staging-responses"
    }
  }
}"#;

    #[test]
    fn builds_default_profile_with_placeholders() -> Result<()> {
        let temp = tempdir()?;
        write_file(&temp.path().join("apiharness.json"), CONFIG);
        write_file(&temp.path().join("default.env"), "TOKEN=from-default\n");

        let loaded = load_config(temp.path())?.expect("config should load");
        let environment = EnvironmentBuilder::new(temp.path().to_path_buf(), Some(loaded)).build()?;

        assert_eq!(environment.profile_name.as_deref(), Some("basic"));
        assert_eq!(environment.api.base_url, "https://api.tvmaze.com");
        assert_eq!(environment.api.auth_type, Some(AuthType::Basic));
        assert_eq!(environment.api.auth.as_deref(), Some("from-default"));
        assert_eq!(
            environment.api.response_output_dir,
            Some(temp.path().join("root-responses"))
        );
        assert_eq!(environment.env_files.len(), 1);
        Ok(())
    }

    #[test]
    fn explicit_profile_and_env_override_defaults() -> Result<()> {
        let temp = tempdir()?;
        let workspace = temp.path().join("workspace");
        std::fs::create_dir_all(&workspace)?;
        write_file(&temp.path().join("apiharness.json"), CONFIG);
        write_file(
            &temp.path().join("override.env"),
            "TOKEN=override\nSESSION=s1\n",
        );

        let loaded = load_config(temp.path())?.expect("config should load");
        let environment = EnvironmentBuilder::new(workspace.clone(), Some(loaded))
            .profile(Some("staging".to_string()))
            .env_file(Some(temp.path().join("override.env")))
            .output_dir(Some(PathBuf::from("out")))
            .build()?;

        assert_eq!(environment.profile_name.as_deref(), Some("staging"));
        assert_eq!(environment.api.base_url, "https://api.tvmaze.com/staging");
        assert_eq!(environment.api.auth.as_deref(), Some("override"));
        assert_eq!(
            environment.api.cookies,
            Some(vec!["session=s1".to_string()])
        );
        assert_eq!(environment.api.headers["X-Trace"], "{raw}");
        assert_eq!(environment.api.response_output_dir, Some(workspace.join("out")));
        Ok(())
    }

    #[test]
    fn unknown_profile_is_rejected() -> Result<()> {
        let temp = tempdir()?;
        write_file(&temp.path().join("apiharness.json"), CONFIG);
        write_file(&temp.path().join("default.env"), "TOKEN=t\n");

        let loaded = load_config(temp.path())?.expect("config should load");
        let err = EnvironmentBuilder::new(temp.path().to_path_buf(), Some(loaded))
            .profile(Some("missing".to_string()))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Unknown profile: missing"));
        Ok(())
    }

    #[test]
    fn missing_variable_names_the_profile() -> Result<()> {
        let temp = tempdir()?;
        write_file(&temp.path().join("apiharness.json"), CONFIG);
        write_file(&temp.path().join("default.env"), "OTHER=1\n");

        let loaded = load_config(temp.path())?.expect("config should load");
        let err = EnvironmentBuilder::new(temp.path().to_path_buf(), Some(loaded))
            .profile(Some("staging".to_string()))
            .build()
            .unwrap_err();
        assert!(format!("{err:#}").contains("expanding profile staging"));
        Ok(())
    }

    #[test]
    fn without_config_still_loads_explicit_env() -> Result<()> {
        let temp = tempdir()?;
        let env_path = temp.path().join("local.env");
        write_file(&env_path, "FOO=bar\n");

        let environment = EnvironmentBuilder::new(temp.path().to_path_buf(), None)
            .env_file(Some(env_path.clone()))
            .output_dir(Some(PathBuf::from("responses")))
            .build()?;

        assert_eq!(environment.profile_name, None);
        assert_eq!(environment.variables.get("FOO"), Some(&"bar".to_string()));
        assert_eq!(environment.env_files, vec![env_path]);
        assert_eq!(
            environment.api.response_output_dir,
            Some(temp.path().join("responses"))
        );
        Ok(())
    }
}
