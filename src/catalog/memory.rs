//! In-memory catalog seeded with the urban energy script and workflow
//! registry.

use async_trait::async_trait;
use serde_json::json;

use super::models::{Script, ScriptInput, ScriptOutput, Workflow, WorkflowStep};
use super::CapabilityProvider;
use crate::error::Result;

/// Insertion-ordered, immutable catalog.
///
/// Workflows are returned in the order they were registered, which makes
/// resolver tie-breaking deterministic.
pub struct MemoryCatalog {
    scripts: Vec<Script>,
    workflows: Vec<Workflow>,
}

impl MemoryCatalog {
    pub fn new(scripts: Vec<Script>, workflows: Vec<Workflow>) -> Self {
        Self { scripts, workflows }
    }

    /// The standard urban energy registry: five analysis scripts and five
    /// workflows composed from them.
    pub fn seeded() -> Self {
        Self::new(seed_scripts(), seed_workflows())
    }
}

#[async_trait]
impl CapabilityProvider for MemoryCatalog {
    async fn initialize(&self) -> Result<()> {
        tracing::info!(
            scripts = self.scripts.len(),
            workflows = self.workflows.len(),
            "Catalog ready"
        );
        Ok(())
    }

    async fn get_all_workflows(&self) -> Result<Vec<Workflow>> {
        Ok(self.workflows.clone())
    }

    async fn get_workflow_by_id(&self, id: &str) -> Result<Option<Workflow>> {
        Ok(self.workflows.iter().find(|w| w.id == id).cloned())
    }

    async fn get_script_by_id(&self, id: &str) -> Result<Option<Script>> {
        Ok(self.scripts.iter().find(|s| s.id == id).cloned())
    }

    async fn search_scripts(
        &self,
        query: Option<&str>,
        category: Option<&str>,
        tags: &[String],
    ) -> Result<Vec<Script>> {
        let query = query.map(str::to_lowercase);
        let tags: Vec<String> = tags.iter().map(|t| t.to_lowercase()).collect();

        Ok(self
            .scripts
            .iter()
            .filter(|script| {
                if let Some(q) = query.as_deref() {
                    let hit = script.name.to_lowercase().contains(q)
                        || script.doc.to_lowercase().contains(q)
                        || script.tags.iter().any(|t| t.to_lowercase().contains(q));
                    if !hit {
                        return false;
                    }
                }
                if let Some(cat) = category {
                    if script.category.as_deref() != Some(cat) {
                        return false;
                    }
                }
                tags.iter().all(|wanted| {
                    script.tags.iter().any(|t| t.to_lowercase() == *wanted)
                })
            })
            .cloned()
            .collect())
    }

    async fn script_help(&self, id: &str) -> Result<Option<String>> {
        let Some(script) = self.get_script_by_id(id).await? else {
            return Ok(None);
        };

        let mut help = format!("{} ({})\n{}\n", script.name, script.id, script.doc);
        if !script.inputs.is_empty() {
            help.push_str("\nInputs:\n");
            for input in &script.inputs {
                let req = if input.required { "required" } else { "optional" };
                help.push_str(&format!(
                    "  {} [{}] ({}): {}\n",
                    input.name, input.input_type, req, input.description
                ));
            }
        }
        if !script.outputs.is_empty() {
            help.push_str("\nOutputs:\n");
            for output in &script.outputs {
                help.push_str(&format!(
                    "  {} [{}]: {}\n",
                    output.name, output.output_type, output.description
                ));
            }
        }
        Ok(Some(help))
    }
}

fn input(
    name: &str,
    input_type: &str,
    description: &str,
    required: bool,
    default: Option<serde_json::Value>,
) -> ScriptInput {
    ScriptInput {
        name: name.to_string(),
        input_type: input_type.to_string(),
        description: description.to_string(),
        required,
        default,
    }
}

fn output(name: &str, output_type: &str, description: &str) -> ScriptOutput {
    ScriptOutput {
        name: name.to_string(),
        output_type: output_type.to_string(),
        description: description.to_string(),
    }
}

fn step(step: u32, script_id: &str, script_name: &str, action: &str, description: &str) -> WorkflowStep {
    WorkflowStep {
        step,
        script_id: script_id.to_string(),
        script_name: script_name.to_string(),
        action: action.to_string(),
        description: description.to_string(),
    }
}

fn tags(list: &[&str]) -> Vec<String> {
    list.iter().map(|t| t.to_string()).collect()
}

fn seed_scripts() -> Vec<Script> {
    vec![
        Script {
            id: "demand-calc-001".to_string(),
            name: "demand_calculation".to_string(),
            path: "scripts/demand_calculation.py".to_string(),
            doc: "Calculate heating and cooling demand for buildings using thermal simulation".to_string(),
            category: Some("demand".to_string()),
            inputs: vec![
                input("scenario_config", "yaml", "Scenario configuration file", true, None),
                input("weather_file", "epw", "Weather data in EnergyPlus format", true, None),
                input("buildings", "shapefile", "Building geometry and properties", true, None),
                input(
                    "occupancy_schedules",
                    "excel",
                    "Building occupancy schedules",
                    false,
                    Some(json!("standard_schedules.xlsx")),
                ),
            ],
            outputs: vec![
                output("demand_results", "csv", "Hourly demand per building"),
                output("demand_summary", "json", "Aggregated demand statistics"),
            ],
            tags: tags(&["demand", "thermal", "heating", "cooling", "energy", "simulation"]),
        },
        Script {
            id: "network-analysis-001".to_string(),
            name: "network_layout".to_string(),
            path: "scripts/network_layout.py".to_string(),
            doc: "Optimize thermal network layout connecting buildings to supply plants".to_string(),
            category: Some("networks".to_string()),
            inputs: vec![
                input("buildings", "shapefile", "Building locations to connect", true, None),
                input("streets", "shapefile", "Street network for pipe routing", true, None),
                input(
                    "algorithm",
                    "string",
                    "Layout algorithm (steiner or mst)",
                    false,
                    Some(json!("steiner")),
                ),
                input("pipe_costs", "csv", "Pipe cost data per diameter", false, None),
            ],
            outputs: vec![
                output("network_layout", "shapefile", "Optimized pipe network"),
                output("network_costs", "json", "Estimated network investment"),
            ],
            tags: tags(&["network", "thermal", "optimization", "layout", "pipes", "infrastructure"]),
        },
        Script {
            id: "supply-optimization-001".to_string(),
            name: "supply_system_optimization".to_string(),
            path: "scripts/supply_system_optimization.py".to_string(),
            doc: "Optimize supply system technology mix for cost and emissions".to_string(),
            category: Some("optimization".to_string()),
            inputs: vec![
                input("energy_demands", "csv", "Demand time series per building", true, None),
                input("technology_database", "excel", "Available conversion and storage technologies", true, None),
                input("objectives", "list", "Optimization objectives", false, None),
                input("solar_potential", "csv", "Rooftop solar potential", false, None),
            ],
            outputs: vec![
                output("pareto_front", "csv", "Non-dominated technology portfolios"),
                output("system_configurations", "json", "Selected system designs"),
            ],
            tags: tags(&["supply", "optimization", "renewable", "storage", "cost", "emissions", "pareto"]),
        },
        Script {
            id: "report-generation-001".to_string(),
            name: "energy_report_generator".to_string(),
            path: "scripts/energy_report_generator.py".to_string(),
            doc: "Generate analysis reports with KPIs and charts from simulation results".to_string(),
            category: Some("reporting".to_string()),
            inputs: vec![
                input("results_directory", "path", "Directory holding analysis outputs", true, None),
                input("report_template", "template", "Report layout template", false, None),
                input(
                    "output_format",
                    "string",
                    "Report format",
                    false,
                    Some(json!("pdf")),
                ),
                input("charts_config", "json", "Chart selection and styling", false, None),
            ],
            outputs: vec![output("report", "pdf", "Rendered analysis report")],
            tags: tags(&["report", "visualization", "kpi", "analysis", "pdf", "charts"]),
        },
        Script {
            id: "validation-001".to_string(),
            name: "model_validation".to_string(),
            path: "scripts/model_validation.py".to_string(),
            doc: "Validate simulation results against measured consumption data".to_string(),
            category: Some("validation".to_string()),
            inputs: vec![
                input("simulation_results", "csv", "Simulated demand time series", true, None),
                input("measured_data", "csv", "Metered consumption data", true, None),
                input("validation_metrics", "list", "Statistical metrics to compute", false, None),
                input(
                    "confidence_level",
                    "float",
                    "Confidence level for uncertainty bounds",
                    false,
                    Some(json!(0.95)),
                ),
            ],
            outputs: vec![
                output("validation_report", "json", "Metric values and pass/fail flags"),
                output("calibration_suggestions", "json", "Parameter adjustment hints"),
            ],
            tags: tags(&["validation", "calibration", "statistics", "uncertainty", "monitoring", "measured"]),
        },
    ]
}

fn seed_workflows() -> Vec<Workflow> {
    vec![
        Workflow {
            id: "workflow-complete-001".to_string(),
            name: "complete_energy_analysis".to_string(),
            description: "Full analysis chain from demand simulation to final report".to_string(),
            steps: vec![
                step(1, "demand-calc-001", "demand_calculation", "calculate_building_demands", "Simulate heating and cooling demand for all buildings"),
                step(2, "network-analysis-001", "network_layout", "optimize_network_layout", "Lay out the thermal network connecting demand points"),
                step(3, "supply-optimization-001", "supply_system_optimization", "optimize_supply_systems", "Select cost and emission optimal supply technologies"),
                step(4, "report-generation-001", "energy_report_generator", "generate_analysis_report", "Compile KPIs and charts into a report"),
            ],
            tags: tags(&["complete", "analysis", "workflow", "energy", "optimization"]),
        },
        Workflow {
            id: "workflow-validation-001".to_string(),
            name: "model_validation_workflow".to_string(),
            description: "Validate simulated performance against measured data".to_string(),
            steps: vec![
                step(1, "demand-calc-001", "demand_calculation", "simulate_building_performance", "Simulate building energy performance"),
                step(2, "validation-001", "model_validation", "validate_against_measured_data", "Compare simulation with metered consumption"),
                step(3, "report-generation-001", "energy_report_generator", "generate_validation_report", "Summarize validation metrics in a report"),
            ],
            tags: tags(&["validation", "calibration", "measured", "uncertainty", "workflow"]),
        },
        Workflow {
            id: "workflow-cooling-demand-001".to_string(),
            name: "estimate_cooling_demand".to_string(),
            description: "Estimate cooling demand for a building or district".to_string(),
            steps: vec![
                step(1, "demand-calc-001", "demand_calculation", "calculate_thermal_loads", "Calculate hourly cooling loads"),
                step(2, "report-generation-001", "energy_report_generator", "generate_demand_summary", "Summarize demand results"),
            ],
            tags: tags(&["cooling", "demand", "estimation", "thermal", "loads"]),
        },
        Workflow {
            id: "workflow-cooling-system-001".to_string(),
            name: "design_cost_optimal_cooling_system".to_string(),
            description: "Design a cost-optimal district cooling system".to_string(),
            steps: vec![
                step(1, "demand-calc-001", "demand_calculation", "calculate_cooling_demands", "Calculate cooling demand per building"),
                step(2, "supply-optimization-001", "supply_system_optimization", "optimize_cooling_systems", "Optimize chiller and storage portfolio"),
                step(3, "report-generation-001", "energy_report_generator", "generate_optimization_report", "Report the selected system design"),
            ],
            tags: tags(&["cost", "optimal", "cooling", "system", "design", "optimization"]),
        },
        Workflow {
            id: "workflow-ghg-evaluation-001".to_string(),
            name: "evaluate_ghg_existing_system".to_string(),
            description: "Evaluate greenhouse gas emissions of an existing supply system".to_string(),
            steps: vec![
                step(1, "demand-calc-001", "demand_calculation", "calculate_energy_demands", "Establish the demand baseline"),
                step(2, "supply-optimization-001", "supply_system_optimization", "assess_emissions", "Assess emissions of the current technology mix"),
                step(3, "report-generation-001", "energy_report_generator", "generate_ghg_report", "Report emission KPIs"),
            ],
            tags: tags(&["ghg", "emissions", "evaluation", "existing", "assessment", "carbon"]),
        },
    ]
}
