//! Metric types queried per resource kind by the per-metric-type and
//! batched strategies.

use crate::sdk::MetricType;
use cloudmon_common::resource::ResourceKind;

pub const VM_CPU_USAGE: MetricType = MetricType::from_static("vm_cpu.usage_active");
pub const VM_MEM_USAGE: MetricType = MetricType::from_static("vm_mem.used_percent");
pub const VM_DISK_USAGE: MetricType = MetricType::from_static("vm_disk.used_percent");
pub const VM_DISK_IO_READ_BPS: MetricType = MetricType::from_static("vm_diskio.read_bps");
pub const VM_DISK_IO_WRITE_BPS: MetricType = MetricType::from_static("vm_diskio.write_bps");
pub const VM_DISK_IO_READ_IOPS: MetricType = MetricType::from_static("vm_diskio.read_iops");
pub const VM_DISK_IO_WRITE_IOPS: MetricType = MetricType::from_static("vm_diskio.write_iops");
pub const VM_NET_BPS_RX: MetricType = MetricType::from_static("vm_netio.bps_recv");
pub const VM_NET_BPS_TX: MetricType = MetricType::from_static("vm_netio.bps_sent");
pub const VM_NET_TCP_CONNECTIONS: MetricType =
    MetricType::from_static("vm_netstat.tcp_connections");
pub const VM_PROCESS_NUMBER: MetricType = MetricType::from_static("vm_process.process_number");

pub const HOST_CPU_USAGE: MetricType = MetricType::from_static("cpu.usage_active");
pub const HOST_MEM_USAGE: MetricType = MetricType::from_static("mem.used_percent");
pub const HOST_DISK_USAGE: MetricType = MetricType::from_static("disk.used_percent");
pub const HOST_DISK_IO_READ_BPS: MetricType = MetricType::from_static("diskio.read_bps");
pub const HOST_DISK_IO_WRITE_BPS: MetricType = MetricType::from_static("diskio.write_bps");
pub const HOST_NET_BPS_RX: MetricType = MetricType::from_static("net.bps_recv");
pub const HOST_NET_BPS_TX: MetricType = MetricType::from_static("net.bps_sent");

pub const RDS_CPU_USAGE: MetricType = MetricType::from_static("rds_cpu.usage_active");
pub const RDS_MEM_USAGE: MetricType = MetricType::from_static("rds_mem.used_percent");
pub const RDS_DISK_USAGE: MetricType = MetricType::from_static("rds_disk.used_percent");
pub const RDS_NET_BPS_RX: MetricType = MetricType::from_static("rds_netio.bps_recv");
pub const RDS_NET_BPS_TX: MetricType = MetricType::from_static("rds_netio.bps_sent");
pub const RDS_CONN_USAGE: MetricType = MetricType::from_static("rds_conn.used_percent");
pub const RDS_QPS: MetricType = MetricType::from_static("rds_qps.query_qps");
pub const RDS_TPS: MetricType = MetricType::from_static("rds_tps.trans_qps");

pub const REDIS_CPU_USAGE: MetricType = MetricType::from_static("dcs_cpu.usage_percent");
pub const REDIS_MEM_USAGE: MetricType = MetricType::from_static("dcs_mem.used_percent");
pub const REDIS_NET_BPS_RX: MetricType = MetricType::from_static("dcs_netio.bps_recv");
pub const REDIS_NET_BPS_TX: MetricType = MetricType::from_static("dcs_netio.bps_sent");
pub const REDIS_USED_CONN: MetricType = MetricType::from_static("dcs_conn.used_conn");
pub const REDIS_OPT_SES: MetricType = MetricType::from_static("dcs_instantopt.opt_sec");
pub const REDIS_CACHE_KEYS: MetricType = MetricType::from_static("dcs_cachekeys.key_count");
pub const REDIS_DATA_MEM_USAGE: MetricType = MetricType::from_static("dcs_datamem.used_byte");

pub const BUCKET_NET_BPS_RX: MetricType = MetricType::from_static("oss_netio.bps_recv");
pub const BUCKET_NET_BPS_TX: MetricType = MetricType::from_static("oss_netio.bps_sent");
pub const BUCKET_LATENCY: MetricType = MetricType::from_static("oss_latency.req_late");
pub const BUCKET_REQUEST_COUNT: MetricType = MetricType::from_static("oss_req.req_count");
pub const BUCKET_REQUEST_4XX: MetricType = MetricType::from_static("oss_req.4xx_count");
pub const BUCKET_REQUEST_5XX: MetricType = MetricType::from_static("oss_req.5xx_count");
pub const BUCKET_STORAGE_SIZE: MetricType = MetricType::from_static("oss_storage.size_bytes");

pub const LB_NET_BPS_RX: MetricType = MetricType::from_static("haproxy.bin");
pub const LB_NET_BPS_TX: MetricType = MetricType::from_static("haproxy.bout");
pub const LB_HRSP_2XX: MetricType = MetricType::from_static("haproxy.hrsp_2xx");
pub const LB_HRSP_4XX: MetricType = MetricType::from_static("haproxy.hrsp_4xx");
pub const LB_HRSP_5XX: MetricType = MetricType::from_static("haproxy.hrsp_5xx");
pub const LB_CURRENT_SESSIONS: MetricType = MetricType::from_static("haproxy.scur");

pub const K8S_NODE_CPU_USAGE: MetricType = MetricType::from_static("k8s_node_cpu.usage_active");
pub const K8S_NODE_MEM_USAGE: MetricType = MetricType::from_static("k8s_node_mem.used_percent");
pub const K8S_POD_CPU_USAGE: MetricType = MetricType::from_static("k8s_pod_cpu.usage_rate");
pub const K8S_POD_MEM_USAGE: MetricType = MetricType::from_static("k8s_pod_mem.used_percent");

pub const EIP_NET_BPS_RX: MetricType = MetricType::from_static("eip_net.bps_recv");
pub const EIP_NET_BPS_TX: MetricType = MetricType::from_static("eip_net.bps_sent");

pub const MODELARTS_POOL_CPU_USAGE: MetricType =
    MetricType::from_static("modelarts_pool_cpu.usage_percent");
pub const MODELARTS_POOL_MEM_USAGE: MetricType =
    MetricType::from_static("modelarts_pool_mem.usage_percent");
pub const MODELARTS_POOL_GPU_UTIL: MetricType =
    MetricType::from_static("modelarts_pool_gpu_util.percent");
pub const MODELARTS_POOL_DISK_USAGE: MetricType =
    MetricType::from_static("modelarts_pool_disk.used_percent");

pub const ALL_VM_METRIC_TYPES: &[MetricType] = &[
    VM_CPU_USAGE,
    VM_MEM_USAGE,
    VM_DISK_USAGE,
    VM_DISK_IO_READ_BPS,
    VM_DISK_IO_WRITE_BPS,
    VM_DISK_IO_READ_IOPS,
    VM_DISK_IO_WRITE_IOPS,
    VM_NET_BPS_RX,
    VM_NET_BPS_TX,
    VM_NET_TCP_CONNECTIONS,
    VM_PROCESS_NUMBER,
];

pub const ALL_HOST_METRIC_TYPES: &[MetricType] = &[
    HOST_CPU_USAGE,
    HOST_MEM_USAGE,
    HOST_DISK_USAGE,
    HOST_DISK_IO_READ_BPS,
    HOST_DISK_IO_WRITE_BPS,
    HOST_NET_BPS_RX,
    HOST_NET_BPS_TX,
];

pub const ALL_RDS_METRIC_TYPES: &[MetricType] = &[
    RDS_CPU_USAGE,
    RDS_MEM_USAGE,
    RDS_DISK_USAGE,
    RDS_NET_BPS_RX,
    RDS_NET_BPS_TX,
    RDS_CONN_USAGE,
    RDS_QPS,
    RDS_TPS,
];

pub const ALL_REDIS_METRIC_TYPES: &[MetricType] = &[
    REDIS_CPU_USAGE,
    REDIS_MEM_USAGE,
    REDIS_NET_BPS_RX,
    REDIS_NET_BPS_TX,
    REDIS_USED_CONN,
    REDIS_OPT_SES,
    REDIS_CACHE_KEYS,
    REDIS_DATA_MEM_USAGE,
];

pub const ALL_BUCKET_METRIC_TYPES: &[MetricType] = &[
    BUCKET_NET_BPS_RX,
    BUCKET_NET_BPS_TX,
    BUCKET_LATENCY,
    BUCKET_REQUEST_COUNT,
    BUCKET_REQUEST_4XX,
    BUCKET_REQUEST_5XX,
    BUCKET_STORAGE_SIZE,
];

pub const ALL_LB_METRIC_TYPES: &[MetricType] = &[
    LB_NET_BPS_RX,
    LB_NET_BPS_TX,
    LB_HRSP_2XX,
    LB_HRSP_4XX,
    LB_HRSP_5XX,
    LB_CURRENT_SESSIONS,
];

pub const ALL_K8S_METRIC_TYPES: &[MetricType] = &[
    K8S_NODE_CPU_USAGE,
    K8S_NODE_MEM_USAGE,
    K8S_POD_CPU_USAGE,
    K8S_POD_MEM_USAGE,
];

pub const ALL_EIP_METRIC_TYPES: &[MetricType] = &[EIP_NET_BPS_RX, EIP_NET_BPS_TX];

pub const ALL_MODELARTS_POOL_METRIC_TYPES: &[MetricType] = &[
    MODELARTS_POOL_CPU_USAGE,
    MODELARTS_POOL_MEM_USAGE,
    MODELARTS_POOL_GPU_UTIL,
    MODELARTS_POOL_DISK_USAGE,
];

/// Metric types of `kind`; storage has none since its samples come from
/// the resource snapshot itself.
pub fn metric_types_for(kind: ResourceKind) -> &'static [MetricType] {
    match kind {
        ResourceKind::Server => ALL_VM_METRIC_TYPES,
        ResourceKind::Host => ALL_HOST_METRIC_TYPES,
        ResourceKind::DbInstance => ALL_RDS_METRIC_TYPES,
        ResourceKind::Redis => ALL_REDIS_METRIC_TYPES,
        ResourceKind::Bucket => ALL_BUCKET_METRIC_TYPES,
        ResourceKind::Loadbalancer => ALL_LB_METRIC_TYPES,
        ResourceKind::K8s => ALL_K8S_METRIC_TYPES,
        ResourceKind::Eip => ALL_EIP_METRIC_TYPES,
        ResourceKind::ModelartsPool => ALL_MODELARTS_POOL_METRIC_TYPES,
        ResourceKind::Storage => &[],
    }
}
