use hazard_config::HarnessConfig;

pub fn run(config: &HarnessConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Print as YAML so the output can be saved and passed back with --config
    let yaml = config.to_yaml()?;
    println!("{}", yaml);

    let problems = config.validate();
    for problem in &problems {
        eprintln!("invalid: {}", problem);
    }
    if !problems.is_empty() {
        return Err(format!("{} configuration problem(s)", problems.len()).into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config_prints() {
        assert!(run(&HarnessConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_config_fails() {
        let err = run(&HarnessConfig::default().with_threads(0)).unwrap_err();
        assert!(err.to_string().contains("1 configuration problem"));
    }
}
