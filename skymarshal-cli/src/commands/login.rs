use crate::util::{CliContext, PromptCredentials};
use anyhow::Result;
use dialoguer::Confirm;
use skymarshal_client::CredentialSource;

pub async fn login() -> Result<()> {
    let ctx = CliContext::init()?;
    loop {
        let Some((handle, password)) = PromptCredentials.credentials() else {
            anyhow::bail!("login aborted");
        };
        match ctx.auth.login(&handle, &password).await {
            Ok(outcome) => {
                if outcome.used_regular_password {
                    println!(
                        "Warning: that looks like your account password. Create an app \
                         password under Settings > Privacy & Security > App Passwords."
                    );
                }
                println!("Logged in as @{}.", outcome.handle);
                return Ok(());
            }
            Err(error) => {
                eprintln!("Authentication failed: {error}");
                if !Confirm::new()
                    .with_prompt("Try logging in again?")
                    .default(true)
                    .interact()?
                {
                    anyhow::bail!("authentication failed");
                }
            }
        }
    }
}

pub async fn logout() -> Result<()> {
    let ctx = CliContext::init()?;
    ctx.auth.logout().await;
    println!("Logged out.");
    Ok(())
}
