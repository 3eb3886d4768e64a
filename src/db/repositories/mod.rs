mod classifications;
mod daily_kpis;
mod readings;
