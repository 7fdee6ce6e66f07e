//! Commands that read or change the configuration.

use parley_ai::TgiClient;
use parley_common::{ConfigError, ParleyError};
use parley_config::Parameter;

use super::Context;
use crate::cli::EndpointCommand;

pub fn endpoint(ctx: &Context, cmd: EndpointCommand) -> Result<(), ParleyError> {
    match cmd {
        EndpointCommand::List => {
            let config = ctx.config.snapshot();
            for (name, address) in &config.endpoints {
                let marker = if *address == config.current_endpoint { "*" } else { " " };
                println!("{marker} {name}  {address}");
            }
            if !config.endpoints.values().any(|a| *a == config.current_endpoint) {
                println!("* (unnamed)  {}", config.current_endpoint);
            }
        }
        EndpointCommand::Add { name, url } => {
            ctx.config.add_endpoint(&name, &url)?;
            println!("Added {name} ({url})");
        }
        EndpointCommand::Remove { name } => match ctx.config.remove_endpoint(&name)? {
            Some(address) => println!("Removed {name} ({address})"),
            None => println!("No endpoint named {name}"),
        },
        EndpointCommand::Use { name_or_url } => {
            let address = ctx.config.resolve_endpoint(&name_or_url);
            ctx.config.update_endpoint(&address, TgiClient::new)?;
            println!("Now using {address}");
        }
    }
    Ok(())
}

pub fn set(ctx: &Context, param: Parameter, value: f64) -> Result<(), ParleyError> {
    let params = ctx.config.update_parameter(param, value)?;
    println!(
        "temperature={} top_p={} max_tokens={}",
        params.temperature, params.top_p, params.max_tokens
    );
    Ok(())
}

pub fn system(ctx: &Context, message: Option<&str>) -> Result<(), ParleyError> {
    match message {
        Some(message) => {
            ctx.config.set_system_message(message)?;
            println!("System message updated.");
        }
        None => println!("{}", ctx.config.system_message()),
    }
    Ok(())
}

pub fn show_config(ctx: &Context) -> Result<(), ParleyError> {
    let config = ctx.config.snapshot();
    let text = toml::to_string_pretty(&config)
        .map_err(|e| ConfigError::WriteError(format!("failed to render config: {e}")))?;
    println!("# {}\n", ctx.config.path().display());
    print!("{text}");
    Ok(())
}
