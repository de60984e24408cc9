use std::{fs, sync::Arc};

use crate::{
    chain_spec::ChainSpec,
    networks::{DEV, HOLESKY, HOODI, MAINNET, SEPOLIA},
};

pub fn chain_spec_parser(network_string: &str) -> Result<Arc<ChainSpec>, String> {
    match network_string {
        "mainnet" => Ok(MAINNET.clone()),
        "holesky" => Ok(HOLESKY.clone()),
        "sepolia" => Ok(SEPOLIA.clone()),
        "hoodi" => Ok(HOODI.clone()),
        "dev" => Ok(DEV.clone()),
        path => read_chain_spec(path).map(Arc::new),
    }
}

fn read_chain_spec(path: &str) -> Result<ChainSpec, String> {
    let contents = fs::read_to_string(path).map_err(|err| format!("Failed to read file: {err}"))?;
    ChainSpec::from_yaml_str(&contents)
        .map_err(|err| format!("Failed to parse chain config from {path}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain_spec::Network;

    #[test]
    fn test_parses_presets() {
        assert_eq!(
            chain_spec_parser("hoodi").map(|spec| spec.network),
            Ok(Network::Hoodi)
        );
    }

    #[test]
    fn test_missing_file() {
        let error = chain_spec_parser("/does/not/exist.yaml").expect_err("file is missing");
        assert!(error.starts_with("Failed to read file"));
    }
}
