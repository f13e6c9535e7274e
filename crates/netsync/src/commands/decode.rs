//! Hostname decoding. Uses the configured tables; never touches the
//! inventory.

use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;

use netsync_core::{DecodedHostname, HostnameDecoder};

use crate::cli::{DecodeArgs, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct Decoded {
    name: String,
    decoded: Option<DecodedHostname>,
}

#[derive(Tabled)]
struct DecodedRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Site")]
    site: String,
    #[tabled(rename = "Floor")]
    floor: String,
    #[tabled(rename = "Subrole")]
    subrole: String,
    #[tabled(rename = "Index")]
    index: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&Decoded> for DecodedRow {
    fn from(d: &Decoded) -> Self {
        let dash = || "-".to_owned();
        match d.decoded {
            Some(ref h) => Self {
                name: d.name.clone(),
                role: h.role.clone(),
                site: h.site.clone(),
                floor: h.floor.to_string(),
                subrole: h.subrole.clone(),
                index: h.index.to_string(),
                status: h.status.clone().unwrap_or_else(dash),
            },
            None => Self {
                name: d.name.clone(),
                role: dash(),
                site: dash(),
                floor: dash(),
                subrole: dash(),
                index: dash(),
                status: dash(),
            },
        }
    }
}

fn plain(d: &Decoded) -> String {
    match d.decoded {
        Some(ref h) => format!("{}\t{}\t{}\t{}", d.name, h.role, h.site, h.subrole),
        None => format!("{}\t-", d.name),
    }
}

fn decode_all(decoder: &HostnameDecoder, names: Vec<String>) -> Vec<Decoded> {
    names
        .into_iter()
        .map(|name| Decoded {
            decoded: decoder.decode(&name),
            name,
        })
        .collect()
}

pub fn handle(args: DecodeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load_config_or_default();
    let decoder = HostnameDecoder::new(Arc::new(cfg.engine.hostname_tables()));
    let results = decode_all(&decoder, args.names);

    let out = output::render_list(global.output, &results, |d| DecodedRow::from(d), plain)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undecodable_names_render_dashes() {
        let decoder = HostnameDecoder::new(Arc::default());
        let results = decode_all(&decoder, vec!["RDEN01CR01".into(), "lab-switch".into()]);

        assert_eq!(plain(&results[0]), "RDEN01CR01\trouter\tDEN\tcore-router");
        assert_eq!(plain(&results[1]), "lab-switch\t-");

        let row = DecodedRow::from(&results[1]);
        assert_eq!(row.role, "-");
        assert_eq!(row.floor, "-");
    }
}
