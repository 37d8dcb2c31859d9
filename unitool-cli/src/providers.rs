//! Demo in-process tool providers.

use rand::Rng;
use rand::seq::IndexedRandom;
use serde_json::Value;
use std::time::Duration;
use unitool_core::{ParameterKind, ToolAnnotations, ToolError};
use unitool_tools::{BoundArguments, InProcessTool, InProcessToolBuilder, ToolProvider};

const CONDITIONS: &[&str] = &["Sunny", "Cloudy", "Rainy", "Snowy"];

fn binary(name: &str, description: &str, a: &str, b: &str) -> InProcessToolBuilder {
    InProcessTool::builder(name)
        .description(description)
        .required("a", ParameterKind::Number, a)
        .required("b", ParameterKind::Number, b)
        .annotations(ToolAnnotations {
            read_only_hint: Some(true),
            idempotent_hint: Some(true),
            ..Default::default()
        })
}

fn operands(args: &BoundArguments) -> Result<(f64, f64), ToolError> {
    Ok((args.get("a")?, args.get("b")?))
}

/// Basic arithmetic.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalculatorService;

impl CalculatorService {
    fn declare(&self) -> Result<Vec<InProcessTool>, unitool_tools::ToolBuildError> {
        Ok(vec![
            binary("Add", "Add two numbers together", "The first number", "The second number")
                .sync_handler(|args| operands(&args).map(|(a, b)| a + b))
                .build()?,
            binary(
                "Subtract",
                "Subtract the second number from the first number",
                "The first number",
                "The second number",
            )
            .sync_handler(|args| operands(&args).map(|(a, b)| a - b))
            .build()?,
            binary("Multiply", "Multiply two numbers together", "The first number", "The second number")
                .sync_handler(|args| operands(&args).map(|(a, b)| a * b))
                .build()?,
            binary("Divide", "Divide the first number by the second number", "The dividend", "The divisor")
                .sync_handler(|args| {
                    let (a, b) = operands(&args)?;
                    if b == 0.0 {
                        return Err(ToolError::execution(args.tool_name(), "Cannot divide by zero"));
                    }
                    Ok(a / b)
                })
                .build()?,
            InProcessTool::builder("SquareRoot")
                .description("Calculate the square root of a number")
                .required("number", ParameterKind::Number, "The number to calculate square root for")
                .sync_handler(|args| {
                    let number: f64 = args.get("number")?;
                    if number < 0.0 {
                        return Err(ToolError::execution(
                            args.tool_name(),
                            "Cannot calculate square root of negative number",
                        ));
                    }
                    Ok(number.sqrt())
                })
                .build()?,
            InProcessTool::builder("Power")
                .description("Calculate the power of a number")
                .required("baseNumber", ParameterKind::Number, "The base number")
                .required("exponent", ParameterKind::Number, "The exponent")
                .sync_handler(|args| {
                    let base: f64 = args.get("baseNumber")?;
                    let exponent: f64 = args.get("exponent")?;
                    Ok::<_, ToolError>(base.powf(exponent))
                })
                .build()?,
        ])
    }
}

impl ToolProvider for CalculatorService {
    fn tools(&self) -> Vec<InProcessTool> {
        match self.declare() {
            Ok(tools) => tools,
            Err(e) => {
                tracing::error!(error = %e, "Calculator tools are misdeclared");
                Vec::new()
            }
        }
    }
}

fn sample_weather() -> (i32, &'static str) {
    let mut rng = rand::rng();
    let temperature = rng.random_range(-10..35);
    let condition = CONDITIONS.choose(&mut rng).copied().unwrap_or("Sunny");
    (temperature, condition)
}

/// Simulated weather lookups.
#[derive(Debug, Clone, Default)]
pub struct WeatherService {
    latency: Duration,
}

impl WeatherService {
    pub fn new() -> Self {
        Self {
            latency: Duration::from_millis(100),
        }
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }
}

impl ToolProvider for WeatherService {
    fn tools(&self) -> Vec<InProcessTool> {
        let latency = self.latency;
        let weather = InProcessTool::builder("GetWeather")
            .description("Get current weather for a specific location")
            .required("city", ParameterKind::String, "The city name")
            .optional("country", ParameterKind::String, Value::Null, "The country code (optional)")
            .annotations(ToolAnnotations {
                read_only_hint: Some(true),
                open_world_hint: Some(true),
                ..Default::default()
            })
            .handler(move |args| async move {
                tokio::time::sleep(latency).await;
                let city: String = args.get("city")?;
                let country: Option<String> = args.get_optional("country")?;
                let location = match country.filter(|c| !c.is_empty()) {
                    Some(country) => format!("{city}, {country}"),
                    None => city,
                };
                let (temperature, condition) = sample_weather();
                Ok::<_, ToolError>(format!("Weather in {location}: {temperature}°C, {condition}"))
            })
            .build();

        match weather {
            Ok(tool) => vec![tool],
            Err(e) => {
                tracing::error!(error = %e, "Weather tool is misdeclared");
                Vec::new()
            }
        }
    }
}

/// Zero-argument sample tool.
#[derive(Debug, Clone, Copy, Default)]
pub struct CitySamples;

impl ToolProvider for CitySamples {
    fn tools(&self) -> Vec<InProcessTool> {
        let population = InProcessTool::builder("GetPopulation")
            .description("Gets the population")
            .sync_handler(|_| {
                let sample: f64 = rand::rng().random();
                tracing::debug!(sample, "GetPopulation sampled");
                let answer = if sample > 0.5 { "Above 5 million" } else { "Below 5 million" };
                Ok::<_, ToolError>(answer)
            })
            .build();

        population.map(|tool| vec![tool]).unwrap_or_default()
    }
}
