use reso_domain::config::Config;
use reso_domain::event::Coordinate;
use reso_suno::{GenerationBackend, SunoClient};

/// Parse one `x,y` click.
pub fn parse_coordinate(raw: &str) -> Result<Coordinate, String> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got '{raw}'"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite() && *n >= 0.0)
            .ok_or_else(|| format!("'{}' is not a non-negative number", v.trim()))
    };
    Ok(Coordinate {
        x: parse(x)?,
        y: parse(y)?,
    })
}

/// Forward clicks straight to the backend. Returns whether a challenge
/// accepted them.
pub async fn solve(config: &Config, coords: &[Coordinate]) -> anyhow::Result<bool> {
    let client = SunoClient::new(&config.suno)?;
    let ok = client.captcha_solve(coords).await?;
    if ok {
        println!("solution accepted ({} click(s))", coords.len());
    } else {
        println!("no CAPTCHA pending");
    }
    Ok(ok)
}
