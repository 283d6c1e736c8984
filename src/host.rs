// SCHEDPIPE HOST INFO
// TOPOLOGY, CPUFREQ STATE AND PLATFORM STRINGS FOR THE REPORT HEADER AND PLOT TITLE

use std::ffi::CStr;
use std::fs;

use regex::Regex;

pub const CPUFREQ_DIR: &str = "/sys/devices/system/cpu/cpu0/cpufreq";
const CPUINFO: &str = "/proc/cpuinfo";

#[derive(Clone, Debug, PartialEq)]
pub struct HostInfo {
    pub cpus: usize,
    pub model_name: String,
    pub platform: String,
    pub governor: String,
    pub cur_freq: String,
}

impl HostInfo {
    pub fn detect() -> Self {
        let model_name = fs::read_to_string(CPUINFO)
            .ok()
            .and_then(|raw| parse_model_name(&raw))
            .unwrap_or_else(|| "unknown".to_string());
        Self {
            cpus: online_cpus(),
            model_name,
            platform: platform(),
            governor: read_cpufreq("scaling_governor"),
            cur_freq: read_cpufreq("scaling_cur_freq"),
        }
    }

    // "8x Intel(R) Core(TM) ..." -- SUBTITLE OF THE PLOT
    pub fn cpu_system(&self) -> String {
        format!("{}x {}", self.cpus, self.model_name)
    }
}

pub fn online_cpus() -> usize {
    let n = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
    if n < 1 {
        1
    } else {
        n as usize
    }
}

pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

// EMPTY STRING WHEN CPUFREQ IS NOT EXPOSED (VMs, CONTAINERS)
pub fn read_cpufreq(attr: &str) -> String {
    fs::read_to_string(format!("{}/{}", CPUFREQ_DIR, attr))
        .unwrap_or_default()
        .trim()
        .to_string()
}

pub fn parse_model_name(cpuinfo: &str) -> Option<String> {
    let re = Regex::new(r"(?m)^model name\s*:\s*(.+?)\s*$").ok()?;
    re.captures(cpuinfo).map(|c| c[1].to_string())
}

// "Linux v6.8.0, x86_64"
pub fn platform() -> String {
    let mut uts: libc::utsname = unsafe { std::mem::zeroed() };
    if unsafe { libc::uname(&mut uts) } != 0 {
        return "unknown".to_string();
    }
    let field = |raw: &[libc::c_char]| unsafe {
        CStr::from_ptr(raw.as_ptr()).to_string_lossy().into_owned()
    };
    format!(
        "{} v{}, {}",
        field(&uts.sysname[..]),
        field(&uts.release[..]),
        field(&uts.machine[..])
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_name_first_match() {
        let raw = "processor\t: 0\nvendor_id\t: GenuineIntel\n\
                   model name\t: Intel(R) Xeon(R) CPU @ 2.20GHz\n\n\
                   processor\t: 1\nmodel name\t: Other\n";
        assert_eq!(
            parse_model_name(raw).as_deref(),
            Some("Intel(R) Xeon(R) CPU @ 2.20GHz")
        );
    }

    #[test]
    fn model_name_missing() {
        assert_eq!(parse_model_name("processor\t: 0\nHardware\t: BCM2835\n"), None);
    }

    #[test]
    fn platform_has_release() {
        let p = platform();
        assert!(p.contains(" v"));
    }

    #[test]
    fn at_least_one_cpu() {
        assert!(online_cpus() >= 1);
        let host = HostInfo::detect();
        assert!(host.cpu_system().starts_with(&format!("{}x ", host.cpus)));
    }
}
