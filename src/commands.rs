use crate::config::{Config, KeyFormat, DEFAULT_TEMPLATE};
use crate::document::PersistedRecords;
use crate::metadata::keys::{external, persistence};
use crate::metadata::Records;
use crate::prelude::*;
use crate::Cli;
use clap::{Args, CommandFactory, Subcommand};
use clap_complete::Shell;
use handlebars::Handlebars;
use itertools::Itertools;
use std::path::{Path, PathBuf};

pub trait Executable {
    fn exec(&self) -> Result<()>;
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a records file between key formats
    #[command(arg_required_else_help = true)]
    Convert(ConvertArgs),
    /// List instances grouped by vpc
    #[command(arg_required_else_help = true)]
    Show(ShowArgs),
    /// Render records through a handlebars template
    #[command(arg_required_else_help = true)]
    Render(RenderArgs),
    /// Print field keys for both formats
    #[command()]
    Keys,
    /// Generate shell completions
    #[command(arg_required_else_help = true)]
    Completions {
        /// Target shell
        shell: Shell,
    },
}

impl Commands {
    pub fn into_executable(self, cfg: Config) -> Box<dyn Executable> {
        match self {
            Commands::Convert(args) => Box::new(Convert::new(args, &cfg)),
            Commands::Show(args) => Box::new(Show::new(args, &cfg)),
            Commands::Render(args) => Box::new(Render::new(args, &cfg)),
            Commands::Keys => Box::new(Keys),
            Commands::Completions { shell } => Box::new(Completions { shell }),
        }
    }
}

pub fn parse_records(content: &str, format: KeyFormat) -> Result<Records> {
    let records = match format {
        KeyFormat::External => serde_json::from_str(content)?,
        KeyFormat::Persistence => Records::from(&serde_json::from_str::<PersistedRecords>(content)?),
    };
    Ok(records)
}

pub fn read_records(path: impl AsRef<Path>, format: KeyFormat) -> Result<Records> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).wrap_err_with(|| f!("can't read {path:?}"))?;
    let records =
        parse_records(&content, format).wrap_err_with(|| f!("can't parse {path:?} as {format:?}"))?;
    tracing::debug!(
        path = ?path,
        vpcs = records.vpcs.len(),
        instances = records.instances.len(),
        "records loaded"
    );
    Ok(records)
}

pub fn write_records(records: &Records, format: KeyFormat, pretty: bool) -> Result<String> {
    let json = match (format, pretty) {
        (KeyFormat::External, true) => serde_json::to_string_pretty(records)?,
        (KeyFormat::External, false) => serde_json::to_string(records)?,
        (KeyFormat::Persistence, true) => {
            serde_json::to_string_pretty(&PersistedRecords::from(records))?
        }
        (KeyFormat::Persistence, false) => serde_json::to_string(&PersistedRecords::from(records))?,
    };
    Ok(json)
}

#[derive(Args)]
pub struct ConvertArgs {
    /// Records file (json)
    pub file: PathBuf,
    /// Format of the input file [default: from config]
    #[arg(long, value_enum)]
    pub from: Option<KeyFormat>,
    /// Format to write [default: the other format]
    #[arg(long, value_enum)]
    pub to: Option<KeyFormat>,
}

pub struct Convert {
    file: PathBuf,
    from: KeyFormat,
    to: KeyFormat,
    pretty: bool,
}

impl Convert {
    pub fn new(ConvertArgs { file, from, to }: ConvertArgs, cfg: &Config) -> Self {
        let from = from.unwrap_or(cfg.format);
        let to = to.unwrap_or_else(|| from.other());
        Self { file, from, to, pretty: cfg.pretty }
    }

    fn output(&self) -> Result<String> {
        let records = read_records(&self.file, self.from)?;
        write_records(&records, self.to, self.pretty)
    }
}

impl Executable for Convert {
    fn exec(&self) -> Result<()> {
        tracing::debug!(from = ?self.from, to = ?self.to, "converting");
        p!("{}", self.output()?);
        Ok(())
    }
}

#[derive(Args)]
pub struct ShowArgs {
    /// Records file (json)
    pub file: PathBuf,
    /// Format of the input file [default: from config]
    #[arg(long, value_enum)]
    pub from: Option<KeyFormat>,
}

pub struct Show {
    file: PathBuf,
    from: KeyFormat,
}

impl Show {
    pub fn new(ShowArgs { file, from }: ShowArgs, cfg: &Config) -> Self {
        Self { file, from: from.unwrap_or(cfg.format) }
    }
}

/// A header line per vpc, then one indented line per instance in it.
pub fn instance_lines(records: &Records) -> Vec<String> {
    let dash = |s: &str| Some(s).not_empty().unwrap_or("-").to_string();
    let groups = records
        .instances
        .iter()
        .sorted_by(|a, b| (&a.vpc_id, &a.instance_id).cmp(&(&b.vpc_id, &b.instance_id)))
        .group_by(|i| i.vpc_id.clone());
    let mut lines = Vec::new();
    for (vpc_id, group) in &groups {
        let group = group.collect_vec();
        let vpc_name = group.first().and_then(|i| records.vpc_of(i)).map_or("", |v| v.vpc_name.as_str());
        lines.push(f!("{} ({})", dash(&vpc_id), dash(vpc_name)));
        for i in group {
            lines.push(f!(
                "  {}  {}  {}  {}  {}",
                dash(&i.instance_id),
                dash(&i.instance_name),
                dash(&i.private_ip),
                dash(&i.public_ip),
                dash(&i.instance_state),
            ));
        }
    }
    lines
}

impl Executable for Show {
    fn exec(&self) -> Result<()> {
        let records = read_records(&self.file, self.from)?;
        if records.instances.is_empty() {
            p!("No instances in {:?}", self.file);
        }
        for line in instance_lines(&records) {
            p!("{line}");
        }
        Ok(())
    }
}

#[derive(Args)]
pub struct RenderArgs {
    /// Records file (json)
    pub file: PathBuf,
    /// Handlebars template [default: from config, else builtin]
    #[arg(long, short)]
    pub template: Option<PathBuf>,
    /// Format of the input file [default: from config]
    #[arg(long, value_enum)]
    pub from: Option<KeyFormat>,
}

pub struct Render {
    file: PathBuf,
    template: Option<PathBuf>,
    from: KeyFormat,
}

impl Render {
    pub fn new(RenderArgs { file, template, from }: RenderArgs, cfg: &Config) -> Self {
        let template = template.or_else(|| cfg.template.as_ref().map(PathBuf::from));
        Self { file, template, from: from.unwrap_or(cfg.format) }
    }
}

pub fn render_records(template: &str, records: &Records) -> Result<String> {
    let mut hb = Handlebars::new();
    hb.register_escape_fn(handlebars::no_escape);
    Ok(hb.render_template(template, records)?)
}

impl Executable for Render {
    fn exec(&self) -> Result<()> {
        let tmpl = match &self.template {
            Some(path) => {
                std::fs::read_to_string(path).wrap_err_with(|| f!("can't read template {path:?}"))?
            }
            None => DEFAULT_TEMPLATE.to_string(),
        };
        let records = read_records(&self.file, self.from)?;
        print!("{}", render_records(&tmpl, &records)?);
        Ok(())
    }
}

pub const KEY_TABLE: &[(&str, &str, &str)] = &[
    ("Vpc.VpcId", external::VPC_ID, persistence::VPC_ID),
    ("Vpc.VpcName", external::VPC_NAME, persistence::VPC_NAME),
    ("Instance.InstanceId", external::INSTANCE_ID, persistence::INSTANCE_ID),
    ("Instance.InstanceName", external::INSTANCE_NAME, persistence::INSTANCE_NAME),
    ("Instance.PrivateIp", external::PRIVATE_IP, persistence::PRIVATE_IP),
    ("Instance.PublicIp", external::PUBLIC_IP, persistence::PUBLIC_IP),
    ("Instance.InstanceState", external::INSTANCE_STATE, persistence::INSTANCE_STATE),
    ("Instance.VpcId", external::VPC_ID, persistence::VPC_ID),
];

pub struct Keys;

impl Executable for Keys {
    fn exec(&self) -> Result<()> {
        let width = KEY_TABLE.iter().map(|(field, ..)| field.len()).max().unwrap_or(0);
        p!("{:width$}  {:20}  persistence", "field", "external");
        for (field, ext, per) in KEY_TABLE {
            p!("{field:width$}  {ext:20}  {per}");
        }
        Ok(())
    }
}

pub struct Completions {
    shell: Shell,
}

impl Executable for Completions {
    fn exec(&self) -> Result<()> {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        clap_complete::generate(self.shell, &mut cmd, name, &mut std::io::stdout());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{Instance, Vpc};
    use assert_matches::assert_matches;

    const EXTERNAL: &str = r#"{
        "vpcs": [
            { "bk_vpc_id": "vpc-3b1f", "bk_vpc_name": "prod" },
            { "bk_vpc_id": "vpc-77aa", "bk_vpc_name": "" }
        ],
        "instances": [
            {
                "bk_instance_id": "ins-b2",
                "bk_instance_name": "web-02",
                "bk_host_innerip": "10.0.1.13",
                "bk_host_outerip": "",
                "bk_instance_state": "stopped",
                "bk_vpc_id": "vpc-3b1f"
            },
            {
                "bk_instance_id": "ins-a1",
                "bk_instance_name": "web-01",
                "bk_host_innerip": "10.0.1.12",
                "bk_host_outerip": "203.0.113.7",
                "bk_instance_state": "running",
                "bk_vpc_id": "vpc-3b1f"
            },
            { "bk_instance_id": "ins-c3", "bk_vpc_id": "vpc-77aa" },
            { "bk_instance_id": "ins-d4" }
        ]
    }"#;

    fn cfg() -> Config {
        Config { pretty: false, ..Config::default() }
    }

    #[test]
    fn parse_external_records() {
        let records = parse_records(EXTERNAL, KeyFormat::External).unwrap();
        assert_eq!(records.vpcs.len(), 2);
        assert_eq!(records.instances.len(), 4);
        assert_eq!(records.instances[2], Instance {
            instance_id: "ins-c3".into(),
            vpc_id: "vpc-77aa".into(),
            ..Instance::default()
        });
    }

    #[test]
    fn convert_round_trips_through_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        std::fs::write(&path, EXTERNAL).unwrap();

        let convert = Convert::new(ConvertArgs { file: path.clone(), from: None, to: None }, &cfg());
        assert_eq!(convert.to, KeyFormat::Persistence);
        let persisted = convert.output().unwrap();

        std::fs::write(&path, &persisted).unwrap();
        let back = read_records(&path, KeyFormat::Persistence).unwrap();
        assert_eq!(back, parse_records(EXTERNAL, KeyFormat::External).unwrap());
    }

    #[test]
    fn unparsable_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "[1, 2").unwrap();
        let err = read_records(&path, KeyFormat::External).unwrap_err();
        assert!(f!("{err}").contains("broken.json"));
        assert_matches!(read_records(dir.path().join("missing.json"), KeyFormat::External), Err(_));
    }

    #[test]
    fn persistence_output_is_documents() {
        let records = Records {
            vpcs: vec![Vpc { vpc_id: "vpc-1".into(), vpc_name: "a".into() }],
            instances: vec![],
        };
        let json = write_records(&records, KeyFormat::Persistence, false).unwrap();
        assert_eq!(json, r#"{"vpcs":[{"bk_vpc_id":"vpc-1","bk_vpc_name":"a"}],"instances":[]}"#);
    }

    #[test]
    fn lines_grouped_by_vpc() {
        let records = parse_records(EXTERNAL, KeyFormat::External).unwrap();
        let lines = instance_lines(&records);
        assert_eq!(
            lines,
            [
                "- (-)",
                "  ins-d4  -  -  -  -",
                "vpc-3b1f (prod)",
                "  ins-a1  web-01  10.0.1.12  203.0.113.7  running",
                "  ins-b2  web-02  10.0.1.13  -  stopped",
                "vpc-77aa (-)",
                "  ins-c3  -  -  -  -",
            ]
        );
    }

    #[test]
    fn persistence_rows_with_foreign_fields_parse() {
        let records = parse_records(
            r#"{"vpcs": [{"bk_vpc_id": "v", "bk_cloud_id": 3, "bk_vpc_name": null}]}"#,
            KeyFormat::Persistence,
        )
        .unwrap();
        assert_eq!(records.vpcs, [Vpc { vpc_id: "v".into(), vpc_name: String::new() }]);
    }

    #[test]
    fn external_null_fields_parse() {
        let records =
            parse_records(r#"{"vpcs": [{"bk_vpc_id": "v", "bk_vpc_name": null}]}"#, KeyFormat::External)
                .unwrap();
        assert_eq!(records.vpcs[0].vpc_name, "");
    }

    #[test]
    fn render_template_comes_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cloudmeta.config.json");
        std::fs::write(&path, r#"{ "template": "~/tmpl/hosts.hbs" }"#).unwrap();
        let config = Config::load_from(&path).unwrap();
        let expected = Config::home_dir().unwrap().join("tmpl/hosts.hbs");

        let args = RenderArgs { file: "r.json".into(), template: None, from: None };
        let render = Render::new(args, &config);
        assert_eq!(render.template, Some(expected));
        assert_eq!(render.from, KeyFormat::External);

        let args = RenderArgs {
            file: "r.json".into(),
            template: Some("own.hbs".into()),
            from: Some(KeyFormat::Persistence),
        };
        let render = Render::new(args, &config);
        assert_eq!(render.template, Some(PathBuf::from("own.hbs")));
        assert_eq!(render.from, KeyFormat::Persistence);

        let render = Render::new(RenderArgs { file: "r.json".into(), template: None, from: None }, &cfg());
        assert_matches!(render.template, None);
    }

    #[test]
    fn renders_builtin_template() {
        let records = parse_records(EXTERNAL, KeyFormat::External).unwrap();
        let out = render_records(DEFAULT_TEMPLATE, &records).unwrap();
        assert!(out.contains("# vpc vpc-3b1f prod"));
        assert!(out.contains("ins-a1\tweb-01\t10.0.1.12\t203.0.113.7\trunning\tvpc-3b1f"));
    }

    #[test]
    fn renders_custom_template_unescaped() {
        let records = Records {
            vpcs: vec![Vpc { vpc_id: "vpc-1".into(), vpc_name: "r&d".into() }],
            instances: vec![],
        };
        let out = render_records("{{#each vpcs}}{{bk_vpc_name}}{{/each}}", &records).unwrap();
        assert_eq!(out, "r&d");
    }

    #[test]
    fn key_table_covers_every_field() {
        assert_eq!(KEY_TABLE.len(), 8);
        assert!(KEY_TABLE.iter().all(|(_, ext, per)| ext == per));
    }
}
