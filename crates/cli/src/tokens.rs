use color_eyre::eyre::{self, WrapErr as _};
use tracing::info;
use trcswap_core::{address::TronAddress, gateway::ChainGateway as _, token::TokenInfo};

use crate::cli::App;

#[derive(clap::Args, Debug)]
pub(crate) struct Tokens {
    /// Read symbol and decimals of this contract from chain instead
    #[arg(long)]
    pub lookup: Option<TronAddress>,
}

impl Tokens {
    pub(crate) async fn run(&self, app: &App) -> eyre::Result<()> {
        let Some(address) = self.lookup else {
            for token in &app.config.tokens {
                println!("{}", describe(token));
            }
            return Ok(());
        };

        info!(%address, "looking up token metadata");
        let symbol = app
            .gateway
            .query_symbol(&address)
            .await
            .wrap_err("failed to read token symbol")?;
        let decimals = app
            .gateway
            .query_decimals(&address)
            .await
            .wrap_err("failed to read token decimals")?;

        let token = TokenInfo {
            address,
            symbol,
            decimals,
        };
        println!("{}", describe(&token));
        println!(
            "{}",
            serde_json::to_string_pretty(&token).wrap_err("failed to render token entry")?
        );
        Ok(())
    }
}

fn describe(token: &TokenInfo) -> String {
    format!("{:<8} {} ({} decimals)", token.symbol, token.address, token.decimals)
}
