//! Config subcommand handlers.

use tabled::Tabled;

use controlcore_config::{Config, Profile, save_config_to, validate_broker};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Broker")]
    broker: String,
    #[tabled(rename = "Root")]
    root: String,
    #[tabled(rename = "Default")]
    default: String,
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_file(global).display().to_string(), false);
            Ok(())
        }

        ConfigCommand::Init { name, force } => {
            let path = config::config_file(global);
            if path.exists() && !force {
                return Err(CliError::ConfigExists {
                    path: path.display().to_string(),
                });
            }

            let mut profile = Profile::default();
            if let Some(ref broker) = global.broker {
                profile.broker.clone_from(broker);
            }
            if let Some(ref root) = global.root {
                profile.root.clone_from(root);
            }
            validate_broker(&profile.broker)?;

            let mut cfg = Config {
                default_profile: Some(name.clone()),
                ..Config::default()
            };
            cfg.profiles.insert(name.clone(), profile);
            save_config_to(&cfg, &path)?;

            if !global.quiet {
                eprintln!("Wrote profile '{name}' to {}", path.display());
            }
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load(global)?;
            let out = match global.output {
                OutputFormat::Table | OutputFormat::Plain => toml::to_string_pretty(&cfg)?,
                ref structured => output::render_single(structured, &cfg, |_| String::new(), |_| String::new())?,
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load(global)?;
            let active = config::active_profile_name(global, &cfg);

            let mut names: Vec<&String> = cfg.profiles.keys().collect();
            names.sort();
            let profiles: Vec<(&String, &Profile)> = names
                .into_iter()
                .filter_map(|n| cfg.profiles.get(n).map(|p| (n, p)))
                .collect();

            let out = output::render_list(
                &global.output,
                &profiles,
                |(name, p)| ProfileRow {
                    name: (*name).clone(),
                    broker: p.broker.clone(),
                    root: p.root.clone(),
                    default: if **name == active { "*".into() } else { String::new() },
                },
                |(name, _)| (*name).clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
