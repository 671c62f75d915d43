
mod cycle_test;
mod router_test;
mod scenario_test;
