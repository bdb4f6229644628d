use bigdecimal::BigDecimal;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    /// 32-byte AES-256 key, supplied as 64 hex characters.
    pub encryption_key: Vec<u8>,
    pub commission_rate: BigDecimal,
    pub commission_fixed_fee: BigDecimal,
    pub settlement_delay_ms: u64,
    pub settlement_success_rate: f64,
    pub reconcile_interval_secs: u64,
    pub reconcile_stale_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        let encryption_key = hex::decode(env::var("ENCRYPTION_KEY")?)?;
        if encryption_key.len() != 32 {
            anyhow::bail!("ENCRYPTION_KEY must decode to exactly 32 bytes");
        }

        let settlement_success_rate: f64 = env::var("SETTLEMENT_SUCCESS_RATE")
            .unwrap_or_else(|_| "0.9".to_string())
            .parse()?;
        if !(0.0..=1.0).contains(&settlement_success_rate) {
            anyhow::bail!("SETTLEMENT_SUCCESS_RATE must be between 0 and 1");
        }

        Ok(Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "3003".to_string())
                .parse()?,
            database_url: env::var("DATABASE_URL")?,
            jwt_secret: env::var("JWT_SECRET")?,
            encryption_key,
            commission_rate: parse_decimal_var("COMMISSION_RATE", "0.025")?,
            commission_fixed_fee: parse_decimal_var("COMMISSION_FIXED_FEE", "0.30")?,
            settlement_delay_ms: env::var("SETTLEMENT_DELAY_MS")
                .unwrap_or_else(|_| "2000".to_string())
                .parse()?,
            settlement_success_rate,
            reconcile_interval_secs: env::var("RECONCILE_INTERVAL_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
            reconcile_stale_secs: env::var("RECONCILE_STALE_SECS")
                .unwrap_or_else(|_| "120".to_string())
                .parse()?,
        })
    }
}

fn parse_decimal_var(name: &str, default: &str) -> anyhow::Result<BigDecimal> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    BigDecimal::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("{} is not a valid decimal: {}", name, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_default() {
        let rate = parse_decimal_var("NO_SUCH_COMMISSION_VAR", "0.025").unwrap();
        assert_eq!(rate, BigDecimal::from_str("0.025").unwrap());
    }
}
