//! Destination paths for rendered node files, relative to the node's
//! provisioning prefix, and cluster-wide default values.

// role=etcd
pub const ETCD_CA_CERT: &str = "etc/pki/tls/certs/etcd-ca.pem";
pub const ETCD_SERVER_CERT: &str = "etc/pki/tls/certs/etcd-server.pem";
pub const ETCD_SERVER_KEY: &str = "etc/pki/tls/private/etcd-server-key.pem";

// role=master|worker
pub const DOCKER_DAEMON_CONFIG: &str = "etc/docker/daemon.json";
pub const SYSCONFIG_DOCKER: &str = "etc/sysconfig/docker";
pub const SYSCONFIG_KUBELET: &str = "etc/sysconfig/kubelet-kaptain";
pub const SYSCONFIG_KUBE_PROXY: &str = "etc/sysconfig/kube-proxy-kaptain";
pub const KUBE_PROXY_CONFIG: &str = "var/lib/kube-proxy/kubeconfig";

// role=master
pub const KUBE_ETCD_CA: &str = "var/lib/kubernetes/etcd-ca.pem";
pub const KUBE_ETCD_CLIENT_CERT: &str = "var/lib/kubernetes/etcd-client.pem";
pub const KUBE_ETCD_CLIENT_KEY: &str = "var/lib/kubernetes/etcd-client-key.pem";
pub const KUBE_CA_CERT: &str = "var/lib/kubernetes/ca.pem";
pub const KUBE_CA_KEY: &str = "var/lib/kubernetes/ca-key.pem";
pub const KUBE_CERT: &str = "var/lib/kubernetes/kubernetes.pem";
pub const KUBE_KEY: &str = "var/lib/kubernetes/kubernetes-key.pem";
pub const KUBE_TOKEN_CSV: &str = "var/lib/kubernetes/token.csv";
pub const KUBELET_CONFIG: &str = "var/lib/kubelet/kubeconfig";
pub const KUBE_CONTROLLER_MANAGER_CONFIG: &str = "var/lib/kubernetes/kube-controller-manager.kubeconfig";
pub const KUBE_SCHEDULER_CONFIG: &str = "var/lib/kubernetes/kube-scheduler.kubeconfig";
pub const KUBE_CLOUD_CONFIG: &str = "var/lib/kubernetes/cloud.conf";
pub const AUTH_TOKEN_WEBHOOK_CONFIG: &str = "var/lib/kubernetes/authn-webhook-config";

pub const KUBE_MANIFEST_APISERVER: &str = "etc/kubernetes/manifests/kube-apiserver.yaml";
pub const KUBE_MANIFEST_CONTROLLER_MANAGER: &str = "etc/kubernetes/manifests/kube-controller-manager.yaml";
pub const KUBE_MANIFEST_SCHEDULER: &str = "etc/kubernetes/manifests/kube-scheduler.yaml";

// role=master|worker, role specific variant of the kubelet sysconfig
pub const SYSCONFIG_KUBELET_EXTRA: &str = "etc/sysconfig/kubelet-kaptain-extra";

// role=worker
pub const KUBELET_BOOTSTRAP_CONFIG: &str = "var/lib/kubelet/bootstrap.kubeconfig";

// default values
pub const DEFAULT_MASTER_SERVICE_IP: &str = "100.64.0.1";
pub const DEFAULT_DNS_CLUSTER_IP: &str = "100.64.0.10";
pub const DEFAULT_SERVICE_CIDR: &str = "100.64.0.0/16";
pub const DEFAULT_POD_CIDR: &str = "100.200.0.0/16";
pub const DEFAULT_KUBE_VERSION: &str = "v1.10.1";
pub const DEFAULT_CLOUD_PROVIDER: &str = "aws";
pub const DEFAULT_KUBE_IMAGE_PROXY: &str = "gcr.io";
pub const DEFAULT_MASTER_PORT: u16 = 6443;
pub const DEFAULT_ETCD_SERVERS: &str = "etcd-k8s-0,etcd-k8s-1,etcd-k8s-2";
pub const DEFAULT_STORE_URL: &str = "s3://aws.all.kaptain?region=eu-west-1";

pub const DEFAULT_CA_EXPIRY_DAYS: u64 = 365 * 5;
pub const DEFAULT_CERT_EXPIRY_DAYS: u64 = 365;
pub const DEFAULT_TOKEN_LENGTH: usize = 32;
pub const DEFAULT_CONTEXT_NAME: &str = "default";
