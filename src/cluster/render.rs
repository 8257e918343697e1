/// Human-readable cluster reports
use comfy_table::{presets::NOTHING, Cell, Table};
use std::fmt;

use super::models::ClusterRecord;

/// Shown instead of field values when a lookup returned no cluster name
pub const MISSING_CLUSTER: &str = "Cluster does not exist or control plane is down";

const TABLE_HEADER: [&str; 7] = [
    "NAME",
    "ID",
    "KUBERNETES",
    "NUM WORKERS",
    "TIMEOUT",
    "TTL",
    "OWNER",
];

/// Right padding per table column
const COLUMN_PADDING: u16 = 3;

impl fmt::Display for ClusterRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_missing() {
            return f.write_str(MISSING_CLUSTER);
        }

        write!(
            f,
            "ID:\t\t{}\nName:\t\t{}\nKubernetes:\tv{}\nWorker nodes:\t{}\nTimeout:\t{} min\nTTL:\t\t{} min\nOwner:\t\t{}\nDetails:\n",
            self.id,
            self.name,
            self.kube_version,
            self.num_workers,
            self.timeout_minutes,
            self.ttl_minutes,
            self.owner,
        )?;
        write!(
            f,
            "\tStatus:\t\t\t{}\n\tEndpoint:\t\t{}\n\tPlatform version:\t{}\n\tVPC config:\t\t{}\n\tIAM role:\t\t{}\n",
            self.detail("status"),
            self.detail("endpoint"),
            self.detail("platformv"),
            self.detail("vpcconf"),
            self.detail("iamrole"),
        )
    }
}

/// Aligned, borderless table with one row per cluster
pub fn cluster_table(records: &[ClusterRecord]) -> Table {
    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_header(TABLE_HEADER.iter().map(Cell::new));

    for cs in records {
        table.add_row(vec![
            Cell::new(&cs.name),
            Cell::new(&cs.id),
            Cell::new(format!("v{}", cs.kube_version)),
            Cell::new(cs.num_workers),
            Cell::new(format!("{} min", cs.timeout_minutes)),
            Cell::new(format!("{} min", cs.ttl_minutes)),
            Cell::new(&cs.owner),
        ]);
    }

    for column in table.column_iter_mut() {
        column.set_padding((0, COLUMN_PADDING));
    }

    table
}
