use std::env;

use anyhow::{bail, Context, Result};
use uuid::Uuid;

use workforce::{
    auth::jwt::JwtService,
    config::{DEFAULT_JWT_AUDIENCE, DEFAULT_JWT_ISSUER},
};

const USAGE: &str =
    "Usage: issue-token --email <email> [--name <name>] [--role team|admin|worker] [--sub <id>] [--minutes <n>]";

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let mut email = None;
    let mut name = None;
    let mut role = "team".to_string();
    let mut subject = None;
    let mut minutes: i64 = 60 * 24;

    let mut args = env::args().skip(1);
    while let Some(flag) = args.next() {
        let value = args
            .next()
            .with_context(|| format!("missing value for {flag}\n{USAGE}"))?;
        match flag.as_str() {
            "--email" => email = Some(value),
            "--name" => name = Some(value),
            "--role" => role = value,
            "--sub" => subject = Some(value),
            "--minutes" => {
                minutes = value
                    .parse()
                    .context("--minutes must be an integer")?;
            }
            other => bail!("unknown argument {other}\n{USAGE}"),
        }
    }

    let Some(email) = email else {
        bail!("--email is required\n{USAGE}");
    };
    let name = name.unwrap_or_else(|| email.clone());
    let subject = subject.unwrap_or_else(|| format!("dev_{}", Uuid::new_v4().simple()));

    let secret = env::var("IDENTITY_JWT_SECRET").context("IDENTITY_JWT_SECRET must be set")?;
    let issuer = env::var("IDENTITY_JWT_ISSUER").unwrap_or_else(|_| DEFAULT_JWT_ISSUER.to_string());
    let audience =
        env::var("IDENTITY_JWT_AUDIENCE").unwrap_or_else(|_| DEFAULT_JWT_AUDIENCE.to_string());

    let jwt = JwtService::new(&secret, &issuer, &audience, minutes);
    let token = jwt.generate_token(&subject, &email, &name, &role)?;
    println!("{token}");
    Ok(())
}
