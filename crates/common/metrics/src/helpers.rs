use prometheus_exporter::prometheus::{
    HistogramVec, IntCounterVec, IntGaugeVec, default_registry,
    register_histogram_vec_with_registry, register_int_counter_vec_with_registry,
    register_int_gauge_vec_with_registry,
};

pub fn create_int_gauge_vec(name: &str, help: &str, label_names: &[&str]) -> IntGaugeVec {
    let registry = default_registry();
    register_int_gauge_vec_with_registry!(name, help, label_names, registry)
        .expect("failed to create int gauge vec")
}

pub fn set_int_gauge_vec(gauge_vec: &IntGaugeVec, value: i64, label_values: &[&str]) {
    gauge_vec.with_label_values(label_values).set(value);
}

pub fn create_int_counter_vec(name: &str, help: &str, label_names: &[&str]) -> IntCounterVec {
    let registry = default_registry();
    register_int_counter_vec_with_registry!(name, help, label_names, registry)
        .expect("failed to create int counter vec")
}

pub fn inc_int_counter_vec(counter_vec: &IntCounterVec, label_values: &[&str]) {
    counter_vec.with_label_values(label_values).inc();
}

pub fn create_histogram_vec(name: &str, help: &str, label_names: &[&str]) -> HistogramVec {
    let registry = default_registry();
    register_histogram_vec_with_registry!(name, help, label_names, registry)
        .expect("failed to create histogram")
}

pub fn observe_histogram_vec(histogram_vec: &HistogramVec, value: f64, label_values: &[&str]) {
    histogram_vec.with_label_values(label_values).observe(value);
}
